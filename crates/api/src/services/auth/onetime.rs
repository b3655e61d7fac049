//! One-time tokens for email verification and password reset.
//!
//! The plaintext token travels in an emailed link; only its SHA-256 digest is
//! persisted. Consuming a token clears the stored digest and expiry in the
//! same update, so a captured database never yields a usable token and a
//! consumed token cannot replay.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token (64 hex characters on the wire).
const TOKEN_BYTES: usize = 32;

/// A freshly generated one-time token.
pub struct OneTimeToken {
    /// Hex token sent to the account holder.
    pub plaintext: String,
    /// SHA-256 hex digest stored in the credential store.
    pub hash: String,
}

/// Generate a new one-time token.
#[must_use]
pub fn generate() -> OneTimeToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);
    OneTimeToken { plaintext, hash }
}

/// Digest a presented token for lookup against the stored hash.
#[must_use]
pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}
