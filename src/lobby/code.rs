//! Lobby code generation and normalization.

use rand::Rng;

pub const CODE_LENGTH: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random 6-character uppercase alphanumeric code.
///
/// The code space (36^6, ~2x10^9) makes collisions practically rare; the
/// caller still checks for collisions and regenerates.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes compare case-insensitively; the canonical form is uppercase.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
