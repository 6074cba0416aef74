//! Identity credentials and content-token claims.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A signed, time-bound proof of identity.
///
/// Produced by the signer when a user authenticates, or synthesized when a
/// content token's scope matches the requested resource. Immutable once
/// issued; held only for the duration of request processing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCredential {
    /// The authenticated username.
    pub username: String,
    /// Issue time, unix seconds.
    pub issued_at: i64,
    /// Expiry time, unix seconds. Derived from the issue time and the
    /// process-wide TTL policy at signing time.
    pub expires_at: i64,
}

impl IdentityCredential {
    /// Check whether the credential has expired at the given instant.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() >= self.expires_at
    }
}

/// Claims embedded in a content token.
///
/// Structurally an identity credential extended with a resource scope. The
/// token is usable only for a request whose route parameters `hash` and
/// `indices` are byte-identical to these fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTokenClaims {
    /// The username the grant is issued for.
    pub username: String,
    /// Torrent identifier the token is scoped to.
    pub hash: String,
    /// Content selection within the torrent, e.g. `"0"`, `"0-2"`, `"1,3"`.
    pub indices: String,
    /// Issue time, unix seconds. Carried into the synthesized session
    /// credential so the grant cannot outlive the originating session.
    pub issued_at: i64,
    /// Expiry time, unix seconds.
    pub expires_at: i64,
}
