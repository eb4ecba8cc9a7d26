//! Vendor translation adapters: Twitter and Facebook, remote-terminated
//! only. Each maps a native message onto the vendor's post-create call and
//! maps the vendor's response back onto a native status.

use {
    async_trait::async_trait,
    implink_common::types::{ClientKind, ClientProfile, NativeMessage, NativeResponse, NativeStatus},
    serde_json::json,
};

use crate::adapter::{ClientAdapter, LazyHttpClient, apply_text_policy};

/// Which vendor API `VendorAdapter` is translating for. The two vendors
/// differ only in the request shape and how the access token is attached;
/// timeout, TLS, and text policy are identical across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VendorKind {
    Twitter,
    Facebook,
}

impl VendorKind {
    fn from_client_kind(kind: ClientKind) -> Self {
        match kind {
            ClientKind::Twitter => Self::Twitter,
            ClientKind::Facebook => Self::Facebook,
            other => unreachable!("VendorAdapter constructed for non-vendor kind {other:?}"),
        }
    }
}

pub struct VendorAdapter {
    profile: ClientProfile,
    http: LazyHttpClient,
    kind: VendorKind,
}

impl VendorAdapter {
    /// # Panics
    ///
    /// Panics if `profile.kind` is not `Twitter` or `Facebook`; callers
    /// dispatch on `kind` before constructing so this never fires.
    #[must_use]
    pub fn new(profile: ClientProfile) -> Self {
        let kind = VendorKind::from_client_kind(profile.kind);
        Self {
            profile,
            http: LazyHttpClient::new(),
            kind,
        }
    }
}

#[async_trait]
impl ClientAdapter for VendorAdapter {
    fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    async fn send(&self, message: &NativeMessage) -> NativeResponse {
        let outgoing = apply_text_policy(&self.profile, message);
        let token = self
            .profile
            .parsed_secret()
            .secret()
            .unwrap_or_default()
            .to_string();

        let client = match self.http.get_or_init(&self.profile).await {
            Ok(client) => client,
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e),
        };

        let base = self.profile.normalized_base();
        let request = match self.kind {
            VendorKind::Twitter => client
                .post(format!("{base}2/tweets"))
                .bearer_auth(&token)
                .json(&json!({ "text": outgoing.text })),
            VendorKind::Facebook => client
                .post(format!("{base}me/messages"))
                .query(&[("access_token", token.as_str())])
                .json(&json!({
                    "recipient": { "id": outgoing.group_id },
                    "message": { "text": outgoing.text },
                })),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return NativeResponse::error(NativeStatus::RequestTimeout, e.to_string());
            },
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e.to_string()),
        };

        let status = NativeStatus::from_transport_code(response.status().as_u16());
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e.to_string()),
        };

        if status.is_ok() {
            NativeResponse::ok(extract_vendor_id(self.kind, &text).unwrap_or(text))
        } else {
            NativeResponse::error(status, extract_vendor_error(&text).unwrap_or(text))
        }
    }
}

/// Best-effort extraction of the vendor-assigned post id from a successful
/// response body, falling back to the raw body when the shape is
/// unrecognized.
fn extract_vendor_id(kind: VendorKind, body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match kind {
        VendorKind::Twitter => value.get("data")?.get("id")?.as_str().map(str::to_string),
        VendorKind::Facebook => value.get("message_id")?.as_str().map(str::to_string),
    }
}

/// Best-effort extraction of a human-readable reason from a vendor error
/// body; vendor error shapes vary, so any recognized field wins and an
/// unrecognized shape falls back to the raw body upstream.
fn extract_vendor_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("errors")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
