//! Content-token grants for session-less access to content routes.
//!
//! A content token is a signed credential extended with a resource scope
//! (`hash` + `indices`). When the scope matches the requested route exactly,
//! the token is exchanged for a regular session credential which then flows
//! through the same mandatory verification as any cookie session. The signer
//! stays the single trust root: a bug in the scope matching here still
//! cannot admit a token that fails signature or expiry checks.

use gangway_core::credential::ContentTokenClaims;
use gangway_signer::{CredentialSigner, SignerResult};
use time::OffsetDateTime;

/// Attempt to convert a query-supplied content token into a session
/// credential for the requested resource.
///
/// Returns the synthesized signed session credential on an exact scope
/// match, `None` otherwise. This function never rejects a request: a
/// malformed, forged, expired, or mis-scoped token is indistinguishable
/// from an absent one, and the caller falls back to the normal session
/// channel.
pub fn try_grant(
    signer: &CredentialSigner,
    route_hash: &str,
    route_indices: &str,
    query_token: Option<&str>,
) -> Option<String> {
    let token = query_token?;
    if token.is_empty() {
        return None;
    }

    // Signature and expiry run through the same verifier as session cookies.
    let payload = signer.verify_payload(token).ok()?;

    // The payload must carry string username/hash/indices and a numeric
    // issue time; anything missing or mistyped yields no grant.
    let username = payload.get("username")?.as_str()?;
    let hash = payload.get("hash")?.as_str()?;
    let indices = payload.get("indices")?.as_str()?;
    let issued_at = payload.get("issuedAt")?.as_i64()?;

    // Exact string equality on both scope fields; no normalization, no
    // prefix or range semantics.
    if hash != route_hash || indices != route_indices {
        return None;
    }

    // Re-sign with the original issue time: the grant's effective session
    // lifetime is tied to the issuance it was derived from.
    let issued = OffsetDateTime::from_unix_timestamp(issued_at).ok()?;
    signer.sign(username, issued).ok()
}

/// Mint a content token scoped to exactly one resource selection.
pub fn mint(
    signer: &CredentialSigner,
    username: &str,
    hash: &str,
    indices: &str,
    issued_at: OffsetDateTime,
) -> SignerResult<String> {
    let issued_at = issued_at.unix_timestamp();
    let claims = ContentTokenClaims {
        username: username.to_string(),
        hash: hash.to_string(),
        indices: indices.to_string(),
        issued_at,
        expires_at: signer.expiry_for(issued_at),
    };
    signer.sign_claims(&claims)
}
