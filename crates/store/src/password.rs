//! Password hashing, treated everywhere else as an opaque one-way function.

use thiserror::Error;

/// Default cost used when `BCRYPT_COST` is not configured.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

pub fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(plain, cost)?)
}

/// Constant-time check of `plain` against a stored hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(plain, hash)?)
}
