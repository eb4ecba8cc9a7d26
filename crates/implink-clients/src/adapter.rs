//! The `ClientAdapter` capability (C4): `send` translates one native message
//! into a vendor call and back; `close` releases the adapter's transport.

use std::time::Duration;

use {
    async_trait::async_trait,
    implink_common::types::{ClientProfile, NativeMessage, NativeResponse},
    tokio::sync::OnceCell,
};

/// `{send, close}` — the narrow capability every client kind implements.
/// Variants own their transport; `ClientRegistry` owns the adapters
/// themselves.
#[async_trait]
pub trait ClientAdapter: Send + Sync {
    fn profile(&self) -> &ClientProfile;

    async fn send(&self, message: &NativeMessage) -> NativeResponse;

    /// Releases the adapter's transport. Called by `ClientRegistry` when an
    /// adapter is replaced or removed; in-flight sends already holding a
    /// clone of the underlying HTTP client are left to finish on their own
    /// deadline. Default is a no-op: `reqwest::Client` tears down its
    /// connection pool on drop without needing an explicit close.
    async fn close(&self) {}
}

/// Applies the user-prefix policy then the truncation policy to a copy of
/// `message`, per the order fixed in the data model (prefix before
/// truncation).
#[must_use]
pub(crate) fn apply_text_policy(profile: &ClientProfile, message: &NativeMessage) -> NativeMessage {
    let mut out = message.clone();

    if profile.prefix_user {
        let user = out.user_name.trim();
        if !user.is_empty() {
            let prefix = format!("{user}: ");
            if !out.text.starts_with(&prefix) {
                out.text = format!("{prefix}{}", out.text);
            }
        }
    }

    if profile.max_text > 3 {
        let budget = (profile.max_text - 3) as usize;
        if out.text.chars().count() > budget {
            let truncated: String = out.text.chars().take(budget).collect();
            out.text = format!("{truncated}...");
        }
    }

    out
}

/// Single-initialization HTTP client behind a `ClientProfile`'s transport
/// settings (timeout, user agent, TLS validation). The client is built on
/// first `send`; profiles that never send never pay for a connection pool.
pub(crate) struct LazyHttpClient {
    cell: OnceCell<reqwest::Client>,
}

impl LazyHttpClient {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_init(&self, profile: &ClientProfile) -> Result<&reqwest::Client, String> {
        self.cell
            .get_or_try_init(|| async {
                let mut builder =
                    reqwest::Client::builder().timeout(Duration::from_millis(profile.timeout_ms));
                if let Some(ua) = profile.user_agent.as_deref() {
                    builder = builder.user_agent(ua);
                }
                if profile.disable_tls_validation {
                    builder = builder.danger_accept_invalid_certs(true);
                }
                builder.build().map_err(|e| e.to_string())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use implink_common::types::ClientKind;

    use super::*;

    fn profile() -> ClientProfile {
        ClientProfile {
            id: "a".into(),
            kind: ClientKind::Stub,
            base_address: "http://x/".into(),
            secret: String::new(),
            user_agent: None,
            max_text: 0,
            timeout_ms: 1000,
            prefix_user: false,
            disable_tls_validation: false,
            enabled: true,
        }
    }

    fn message(text: &str) -> NativeMessage {
        NativeMessage {
            gateway_id: None,
            group_id: "g1".into(),
            user_name: "alice".into(),
            tag: None,
            msg_id: None,
            parent_msg_id: None,
            text: text.into(),
        }
    }

    #[test]
    fn prefix_runs_before_truncation() {
        let mut profile = profile();
        profile.prefix_user = true;
        profile.max_text = 10;
        let out = apply_text_policy(&profile, &message("hello world"));
        assert!(out.text.starts_with("alice: "));
        assert_eq!(out.text.chars().count(), 10);
        assert!(out.text.ends_with("..."));
    }

    #[test]
    fn prefix_skipped_when_already_present() {
        let mut profile = profile();
        profile.prefix_user = true;
        let out = apply_text_policy(&profile, &message("alice: already prefixed"));
        assert_eq!(out.text, "alice: already prefixed");
    }

    #[test]
    fn truncation_noop_under_budget() {
        let mut profile = profile();
        profile.max_text = 100;
        let out = apply_text_policy(&profile, &message("short"));
        assert_eq!(out.text, "short");
    }

    #[test]
    fn truncation_disabled_at_or_below_three() {
        let mut profile = profile();
        profile.max_text = 3;
        let out = apply_text_policy(&profile, &message("this is definitely too long"));
        assert_eq!(out.text, "this is definitely too long");
    }
}
