//! Signing secret type and loading.

use crate::error::{SignerError, SignerResult};
use base64::Engine;
use rand_core::{OsRng, RngCore};
use std::fmt;

/// Length of a generated signing secret in bytes.
const SECRET_LENGTH: usize = 32;

/// Minimum accepted secret length. Shorter secrets make the credential
/// scheme brute-forceable.
const MIN_SECRET_LENGTH: usize = 16;

/// A process-wide signing secret.
///
/// Loaded once at startup and immutable for the process lifetime; a secret
/// change invalidates every outstanding credential.
#[derive(Clone)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parse from a base64-encoded string.
    pub fn from_base64(s: &str) -> SignerResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| SignerError::SecretParsing(format!("invalid base64: {e}")))?;

        if bytes.len() < MIN_SECRET_LENGTH {
            return Err(SignerError::SecretParsing(format!(
                "secret too short: {} bytes, need at least {MIN_SECRET_LENGTH}",
                bytes.len()
            )));
        }

        Ok(Self { bytes })
    }

    /// Encode as base64 for storage.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Get the raw secret bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}
