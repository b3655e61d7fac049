//! Password hashing with bcrypt.
//!
//! The cost factor is fixed at hash time; verification reads the cost factor
//! embedded in the stored hash, so hashes created under an older (cheaper)
//! cost keep verifying after a future cost increase.

/// bcrypt work factor applied to new hashes.
pub const BCRYPT_COST: u32 = 12;

/// Hash a password.
///
/// # Errors
///
/// Returns `bcrypt::BcryptError` if hashing fails. Hashing failure is fatal
/// to the registration or password-change operation that requested it.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

/// Verify a password against a stored hash.
///
/// Never errors: an unparseable stored hash verifies as `false`, the same as
/// a wrong password, so callers cannot leak account state through error
/// shapes.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
