//! Signer error types.

use thiserror::Error;

/// Errors raised while loading secrets or signing claims.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("secret parsing failed: {0}")]
    SecretParsing(String),

    #[error("claims serialization failed: {0}")]
    Serialization(String),
}

/// Result type for signer operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;

/// Why a presented token failed verification.
///
/// This is a value, not an exception: malformed input is an expected outcome
/// of verifying untrusted data and must never abort request processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// The token is not structurally a signed credential (bad framing,
    /// bad base64, or an undecodable payload).
    Malformed,
    /// The signature does not match the payload under the current secret.
    BadSignature,
    /// The signature is valid but the embedded expiry has passed.
    Expired,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed token"),
            Self::BadSignature => write!(f, "bad signature"),
            Self::Expired => write!(f, "token expired"),
        }
    }
}
