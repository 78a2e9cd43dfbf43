//! Session tokens and password digests.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix of every session token.
const TOKEN_PREFIX: &str = "rm_";

/// Random bytes per token.
const TOKEN_BYTES: usize = 24;

/// Generate a fresh opaque session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Hex-encoded SHA-256 of a password, as stored for registered accounts.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert!(a.starts_with("rm_"));
        assert_eq!(a.len(), 3 + TOKEN_BYTES * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
