//! Credential signing and verification for the gangway management API.
//!
//! This crate provides:
//! - Signing secret loading and generation
//! - Session credential signing (HMAC-SHA256)
//! - Verification returning a failure value, never a panic

pub mod error;
pub mod secret;
pub mod signer;

pub use error::{SignerError, SignerResult, VerifyError};
pub use secret::Secret;
pub use signer::CredentialSigner;
