//! Test-only client kind: reflects an HTTP status named by the message
//! text, or echoes/generates a `msgId` on anything else.

use {
    async_trait::async_trait,
    implink_common::types::{ClientProfile, NativeMessage, NativeResponse, NativeStatus},
    rand::Rng,
};

use crate::adapter::{ClientAdapter, apply_text_policy};

pub struct StubAdapter {
    profile: ClientProfile,
}

impl StubAdapter {
    #[must_use]
    pub fn new(profile: ClientProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ClientAdapter for StubAdapter {
    fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    async fn send(&self, message: &NativeMessage) -> NativeResponse {
        let outgoing = apply_text_policy(&self.profile, message);

        if let Some(status) = parse_status_name(outgoing.text.trim()) {
            return if status.is_ok() {
                NativeResponse::ok(outgoing.msg_id.unwrap_or_else(generate_msg_id))
            } else {
                NativeResponse::error(status, format!("stub returned {status:?}"))
            };
        }

        NativeResponse::ok(outgoing.msg_id.unwrap_or_else(generate_msg_id))
    }
}

fn parse_status_name(text: &str) -> Option<NativeStatus> {
    match text {
        "Ok" => Some(NativeStatus::Ok),
        "BadRequest" => Some(NativeStatus::BadRequest),
        "Unauthorized" => Some(NativeStatus::Unauthorized),
        "RequestTimeout" => Some(NativeStatus::RequestTimeout),
        "TooManyRequests" => Some(NativeStatus::TooManyRequests),
        "InternalServerError" => Some(NativeStatus::InternalServerError),
        _ => None,
    }
}

/// 12-character lowercase-alphanumeric id, matching the `msgId` format used
/// when the router auto-assigns one.
fn generate_msg_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..12)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
