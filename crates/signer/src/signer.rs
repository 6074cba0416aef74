//! Credential signing and verification.

use crate::error::{SignerError, SignerResult, VerifyError};
use crate::secret::Secret;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gangway_core::credential::IdentityCredential;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies time-bound credentials.
///
/// A token is `base64url(payload) "." base64url(hmac_sha256(secret, payload))`
/// where the payload is a JSON object carrying at least an `expiresAt` unix
/// timestamp. Signing is deterministic given the secret; verification is a
/// pure function over (secret, input, current time).
pub struct CredentialSigner {
    secret: Secret,
    ttl: Duration,
}

impl CredentialSigner {
    /// Create a signer from a secret and the session time-to-live policy.
    pub fn new(secret: Secret, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// The configured credential time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry timestamp derived from an issue time under the TTL policy.
    pub fn expiry_for(&self, issued_at: i64) -> i64 {
        issued_at.saturating_add(self.ttl.whole_seconds())
    }

    /// Sign a session credential for `username` issued at `issued_at`.
    ///
    /// The embedded expiry is derived from the issue time, so re-signing with
    /// an old issue time yields a credential that expires with the original.
    pub fn sign(&self, username: &str, issued_at: OffsetDateTime) -> SignerResult<String> {
        let issued_at = issued_at.unix_timestamp();
        let credential = IdentityCredential {
            username: username.to_string(),
            issued_at,
            expires_at: self.expiry_for(issued_at),
        };
        self.sign_claims(&credential)
    }

    /// Sign an arbitrary claims object with the process-wide secret.
    ///
    /// The claims must serialize to a JSON object embedding an `expiresAt`
    /// field, or verification will reject the result as malformed.
    pub fn sign_claims<T: Serialize>(&self, claims: &T) -> SignerResult<String> {
        let payload = serde_json::to_vec(claims)
            .map_err(|e| SignerError::Serialization(e.to_string()))?;
        let tag = self.mac()?.chain_update(&payload).finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Verify a session credential token.
    ///
    /// Returns a failure value for any malformed, forged, or expired input;
    /// never panics on untrusted data.
    pub fn verify(&self, token: &str) -> Result<IdentityCredential, VerifyError> {
        let payload = self.verify_payload(token)?;
        serde_json::from_value(payload).map_err(|_| VerifyError::Malformed)
    }

    /// Verify signature and expiry, returning the decoded payload.
    ///
    /// Used by callers that accept extended payloads (content tokens) and
    /// schema-validate the shape themselves.
    pub fn verify_payload(&self, token: &str) -> Result<serde_json::Value, VerifyError> {
        let (payload_b64, tag_b64) = token.split_once('.').ok_or(VerifyError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| VerifyError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| VerifyError::Malformed)?;

        // Mac::verify_slice is constant-time over the tag bytes.
        self.mac()
            .map_err(|_| VerifyError::BadSignature)?
            .chain_update(&payload)
            .verify_slice(&tag)
            .map_err(|_| VerifyError::BadSignature)?;

        let value: serde_json::Value =
            serde_json::from_slice(&payload).map_err(|_| VerifyError::Malformed)?;

        let expires_at = value
            .get("expiresAt")
            .and_then(serde_json::Value::as_i64)
            .ok_or(VerifyError::Malformed)?;
        if OffsetDateTime::now_utc().unix_timestamp() >= expires_at {
            return Err(VerifyError::Expired);
        }

        Ok(value)
    }

    fn mac(&self) -> SignerResult<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SignerError::SecretParsing(e.to_string()))
    }
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
