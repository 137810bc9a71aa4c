//! One-time token generation for email verification and password reset

use rand::RngCore;
use rand::rngs::OsRng;

/// Raw entropy per token, before hex encoding.
const TOKEN_BYTES: usize = 32;

/// Generate a one-time token: 32 random bytes, hex encoded.
///
/// 256 bits of entropy from the OS RNG, so collisions and guessing are out
/// of the question. Validity windows and consumption are enforced by the
/// auth service against the user record, not here.
pub fn generate_one_time_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
