//! Password hashing with Argon2id
//!
//! Each hash uses a fresh random salt, so hashing the same password twice
//! yields different digests. Verification parses the salt back out of the
//! PHC string and relies on the crate's constant-time comparison.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use tracing::error;

use crate::error::AuthError;

/// Hash a plaintext password into a PHC-format digest.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            AuthError::Internal
        })
}

/// Verify a plaintext password against a stored digest.
///
/// Returns false on mismatch or on an unparsable digest; never errors for
/// well-formed strings.
pub fn verify_password(password: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
