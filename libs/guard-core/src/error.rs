//! Error taxonomy shared by the offline and online halves of the guard.
//!
//! Every expected failure path maps onto one of five variants. Nothing here
//! is retried internally; callers decide retry policy, typically by checking
//! [`GuardError::is_transport`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Failure reason used when the service supplied no structured detail
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The service understood the request and declined it, or a genuine
    /// token is not acceptable (expired, wrong issuer/audience).
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// Transport-level or contractual failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Token string does not decode into the expected structure
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Signature verification failed against the resolved key
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// Token names a key id that is absent from the current key snapshot
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),
}

/// Transport and contract violations surfaced as [`GuardError::Protocol`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("no content")]
    NoContent,

    #[error("response body could not be decoded: {0}")]
    Decode(String),

    #[error("unexpected status {status}: {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl GuardError {
    /// Build an [`GuardError::AuthRejected`] from an optional service detail,
    /// falling back to [`UNKNOWN_ERROR`] when the detail is absent or blank.
    pub fn rejected(detail: Option<String>) -> Self {
        match detail {
            Some(d) if !d.trim().is_empty() => Self::AuthRejected(d),
            _ => Self::AuthRejected(UNKNOWN_ERROR.to_string()),
        }
    }

    /// True for transport-level failures (timeouts, connection errors, bad
    /// bodies). Application rejections and token faults return false.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// True when the failure means the caller must not trust the token.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            Self::AuthRejected(_)
                | Self::MalformedToken(_)
                | Self::SignatureInvalid
                | Self::UnknownKey(_)
        )
    }
}
