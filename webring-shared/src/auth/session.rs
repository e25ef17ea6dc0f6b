/// Session bearer tokens
///
/// Tokens are 48 random base62 characters handed to the client once at login.
/// Only their SHA-256 digest is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random token
pub const TOKEN_LENGTH: usize = 48;

/// Generates a new session token
///
/// Returns `(token, token_hash)`. The token is returned to the client, the hash
/// is stored.
pub fn generate_session_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let token: String = (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let hash = hash_session_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of a session token (64 characters)
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let (token, hash) = generate_session_token();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(hash, hash_session_token(&token));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_tokens_are_unique() {
        let (a, _) = generate_session_token();
        let (b, _) = generate_session_token();
        assert_ne!(a, b);
    }
}
