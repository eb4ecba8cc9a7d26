use thiserror::Error;

/// Reasons `Authenticator::verify` can fail. Callers at the HTTP boundary
/// should collapse all of these to a generic "Authentication failed"
/// message before returning it to the caller — the specific reason is for
/// logs, not the wire.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    #[error("timestamp header is not a valid integer")]
    InvalidTimestamp,
    #[error("timestamp is outside the allowed skew window")]
    SkewExceeded,
    #[error("signature mismatch")]
    SignatureMismatch,
}
