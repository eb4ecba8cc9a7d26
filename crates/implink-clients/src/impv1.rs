//! The native-protocol client kind: posts signed JSON to another implink
//! instance's `/PostMessage`.

use {
    async_trait::async_trait,
    implink_auth::Authenticator,
    implink_common::types::{ClientProfile, NativeMessage, NativeResponse, NativeStatus},
    tracing::warn,
};

use crate::adapter::{ClientAdapter, LazyHttpClient, apply_text_policy};

/// Signs outbound requests with the profile's `SECRET` and verifies that
/// the peer's declared response status agrees with the transport status.
pub struct ImpV1Adapter {
    profile: ClientProfile,
    http: LazyHttpClient,
    authenticator: Authenticator,
}

impl ImpV1Adapter {
    #[must_use]
    pub fn new(profile: ClientProfile) -> Self {
        let secret = profile
            .parsed_secret()
            .secret()
            .unwrap_or_default()
            .as_bytes()
            .to_vec();
        Self {
            authenticator: Authenticator::new(secret),
            http: LazyHttpClient::new(),
            profile,
        }
    }
}

#[async_trait]
impl ClientAdapter for ImpV1Adapter {
    fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    async fn send(&self, message: &NativeMessage) -> NativeResponse {
        let outgoing = apply_text_policy(&self.profile, message);
        let body = match serde_json::to_vec(&outgoing) {
            Ok(body) => body,
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e.to_string()),
        };

        let client = match self.http.get_or_init(&self.profile).await {
            Ok(client) => client,
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e),
        };

        let signed = self.authenticator.sign(&body);
        let url = format!("{}PostMessage", self.profile.normalized_base());
        let response = client
            .post(url)
            .header(implink_auth::HEADER_TIMESTAMP, signed.timestamp)
            .header(implink_auth::HEADER_NONCE, signed.nonce)
            .header(implink_auth::HEADER_SIGN, signed.signature)
            .header(implink_auth::HEADER_API, "ImpV1")
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return NativeResponse::error(NativeStatus::RequestTimeout, e.to_string());
            },
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e.to_string()),
        };

        let transport_status = NativeStatus::from_transport_code(response.status().as_u16());
        let transport_code = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return NativeResponse::error(NativeStatus::InternalServerError, e.to_string()),
        };

        match serde_json::from_str::<NativeResponse>(&text) {
            Ok(mut declared) => {
                if declared.status.code() != transport_code {
                    warn!(
                        client = %self.profile.id,
                        declared = declared.status.code(),
                        transport = transport_code,
                        "ImpV1 peer's declared status disagrees with transport status"
                    );
                    declared.status = transport_status;
                }
                declared
            },
            Err(_) => NativeResponse {
                status: transport_status,
                content: Some(text),
            },
        }
    }
}
