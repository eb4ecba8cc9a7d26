//! The routing core's data model: wire messages, responses, and the two
//! profile row types (`ClientProfile`, `RouteProfile`) that make up the
//! routing table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which side of the bridge a route serves.
///
/// `RemoteTerminated` routes accept locally-originated messages and forward
/// them out to third parties; `RemoteOriginated` routes accept third-party
/// traffic (HMAC-verified) and fan it in to local services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    RemoteTerminated,
    RemoteOriginated,
}

impl Direction {
    #[must_use]
    pub fn is_remote_originated(self) -> bool {
        matches!(self, Self::RemoteOriginated)
    }
}

/// The vendor a [`ClientProfile`] talks to. There is deliberately no
/// `None` variant — an unparseable or missing kind is represented by the
/// absence of a successfully parsed `ClientKind`, so "kind must not be
/// none" is enforced by the type system at the parse boundary rather than
/// by a runtime check against a sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientKind {
    ImpV1,
    Twitter,
    Facebook,
    Stub,
}

impl std::str::FromStr for ClientKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ImpV1" => Ok(Self::ImpV1),
            "Twitter" => Ok(Self::Twitter),
            "Facebook" => Ok(Self::Facebook),
            "Stub" => Ok(Self::Stub),
            other => Err(crate::Error::message(format!("unknown client kind: {other}"))),
        }
    }
}

impl ClientKind {
    /// Native-protocol variants participate in reply (`parentMsgId`)
    /// fan-out; vendor translation variants do not.
    #[must_use]
    pub fn is_native(self) -> bool {
        matches!(self, Self::ImpV1 | Self::Stub)
    }
}

/// Opaque key-value secret blob, parsed from a `"k=v,k=v"` string.
///
/// Recognized keys include `SECRET`. Unknown keys are retained but ignored,
/// matching the "opaque key-value mapping" wording of the data model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedSecret(HashMap<String, String>);

impl ParsedSecret {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut map = HashMap::new();
        for pair in raw.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            if let Some((k, v)) = pair.split_once('=') {
                map.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        Self(map)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.get("SECRET")
    }
}

/// An outbound endpoint description: `id` is a case-insensitive unique key.
///
/// Serializes as camelCase to match the file-backend's JSON schema (§6:
/// "case-insensitive property names and null fields omitted").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub id: String,
    pub kind: ClientKind,
    pub base_address: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Truncation budget in characters. `<= 0` disables truncation.
    #[serde(default)]
    pub max_text: i64,
    /// Send timeout in milliseconds. Must be `>= 1`.
    #[serde(default = "default_timeout_ms", rename = "timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub prefix_user: bool,
    /// Test-only: skip TLS certificate validation.
    #[serde(default)]
    pub disable_tls_validation: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl ClientProfile {
    /// Validates the invariants from the data model: non-empty id,
    /// well-formed `base_address` with a scheme, timeout at least 1ms.
    pub fn check_validity(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::message("client profile id must not be empty"));
        }
        if !self.base_address.contains("://") {
            return Err(crate::Error::message(format!(
                "client '{}' has a malformed base_address (missing scheme)",
                self.id
            )));
        }
        if self.timeout_ms < 1 {
            return Err(crate::Error::message(format!(
                "client '{}' timeout must be >= 1ms",
                self.id
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn parsed_secret(&self) -> ParsedSecret {
        ParsedSecret::parse(&self.secret)
    }

    /// `base_address` normalized to exactly one trailing slash.
    #[must_use]
    pub fn normalized_base(&self) -> String {
        format!("{}/", self.base_address.trim_end_matches('/'))
    }
}

/// A routing rule: `id` is interpreted as a group-id on remote-terminated
/// routes, and as a gateway-id on remote-originated routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProfile {
    pub id: String,
    #[serde(rename = "isRemoteOriginated", with = "direction_as_bool")]
    pub direction: Direction,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ordered list of client ids. Accepts either a JSON array or a single
    /// comma-separated string on the wire.
    #[serde(deserialize_with = "deserialize_clients")]
    pub clients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// HMAC key. Required on remote-originated routes, forbidden (must be
    /// empty) on remote-terminated routes.
    #[serde(default)]
    pub secret: String,
    /// Requests per minute; `<= 0` disables throttling.
    #[serde(default)]
    pub throttle_rate: i64,
    /// Whether parent-referencing (reply) messages are permitted.
    #[serde(default)]
    pub replies: bool,
}

mod direction_as_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Direction;

    pub fn serialize<S: Serializer>(direction: &Direction, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(direction.is_remote_originated())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Direction, D::Error> {
        let is_remote_originated = bool::deserialize(d)?;
        Ok(if is_remote_originated {
            Direction::RemoteOriginated
        } else {
            Direction::RemoteTerminated
        })
    }
}

fn deserialize_clients<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    Ok(match StringOrVec::deserialize(d)? {
        StringOrVec::String(s) => RouteProfile::parse_clients(&s),
        StringOrVec::Vec(v) => v,
    })
}

impl RouteProfile {
    pub fn parse_clients(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validates the invariants: non-empty id, at least one named client,
    /// and secret presence matching direction. Unresolved client names are
    /// a registry-time warning, not a validation failure here.
    pub fn check_validity(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::message("route profile id must not be empty"));
        }
        if self.clients.is_empty() {
            return Err(crate::Error::message(format!(
                "route '{}' lists no clients",
                self.id
            )));
        }
        match self.direction {
            Direction::RemoteOriginated if self.secret.trim().is_empty() => Err(
                crate::Error::message(format!("route '{}' requires a secret (remote-originated)", self.id)),
            ),
            Direction::RemoteTerminated if !self.secret.trim().is_empty() => Err(crate::Error::message(
                format!("route '{}' must not carry a secret (remote-terminated)", self.id),
            )),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn tag_set(&self) -> std::collections::HashSet<String> {
        self.tags.clone().unwrap_or_default().into_iter().collect()
    }
}

/// The HTTP-shaped status used on [`NativeResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum NativeStatus {
    Ok,
    BadRequest,
    Unauthorized,
    RequestTimeout,
    TooManyRequests,
    InternalServerError,
}

impl NativeStatus {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::RequestTimeout => 408,
            Self::TooManyRequests => 429,
            Self::InternalServerError => 500,
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Maps an arbitrary transport status code to the nearest
    /// [`NativeStatus`], passing 2xx through as `Ok` and leaving everything
    /// else as `InternalServerError` for the caller to re-tag if it knows
    /// better (e.g. a literal 429 from downstream).
    #[must_use]
    pub fn from_transport_code(code: u16) -> Self {
        match code {
            200..=299 => Self::Ok,
            400 => Self::BadRequest,
            401 | 403 => Self::Unauthorized,
            408 => Self::RequestTimeout,
            429 => Self::TooManyRequests,
            _ => Self::InternalServerError,
        }
    }
}

impl From<NativeStatus> for u16 {
    fn from(value: NativeStatus) -> Self {
        value.code()
    }
}

impl TryFrom<u16> for NativeStatus {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::Ok),
            400 => Ok(Self::BadRequest),
            401 => Ok(Self::Unauthorized),
            408 => Ok(Self::RequestTimeout),
            429 => Ok(Self::TooManyRequests),
            500 => Ok(Self::InternalServerError),
            other => Err(format!("unsupported native status code: {other}")),
        }
    }
}

/// The on-the-wire message schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    pub group_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_msg_id: Option<String>,
    pub text: String,
}

impl NativeMessage {
    /// `400 BadRequest`-worthy schema checks: field lengths and mandatory
    /// fields. `gateway_id` is only mandatory on remote-originated inbound,
    /// which is checked by the caller (the router already knows direction).
    pub fn check_validity(&self, require_gateway_id: bool) -> crate::Result<()> {
        const MAX_LEN: usize = 64;

        if self.group_id.is_empty() || self.group_id.len() > MAX_LEN {
            return Err(crate::Error::message("groupId must be 1..=64 chars"));
        }
        if self.user_name.is_empty() || self.user_name.len() > MAX_LEN {
            return Err(crate::Error::message("userName must be 1..=64 chars"));
        }
        if require_gateway_id
            && self
                .gateway_id
                .as_ref()
                .is_none_or(|g| g.is_empty() || g.len() > MAX_LEN)
        {
            return Err(crate::Error::message(
                "gatewayId is mandatory on remote-originated inbound",
            ));
        }
        if let Some(gw) = &self.gateway_id
            && gw.len() > MAX_LEN
        {
            return Err(crate::Error::message("gatewayId must be <= 64 chars"));
        }
        if self.text.is_empty() {
            return Err(crate::Error::message("text must not be empty"));
        }
        Ok(())
    }
}

/// The response to a `/PostMessage` or `/GetTime` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeResponse {
    pub status: NativeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NativeResponse {
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: NativeStatus::Ok,
            content: Some(content.into()),
        }
    }

    #[must_use]
    pub fn error(status: NativeStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            content: Some(reason.into()),
        }
    }
}
