//! Generation and verification of opaque, high-entropy secrets: client
//! secrets, OAuth tokens (authorization codes, refresh tokens), and API keys.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Minimum length for generated secrets (client secrets, API-key secrets).
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default length for generated secrets.
pub const DEFAULT_SECRET_LENGTH: usize = 48;

/// Bcrypt cost factor for hashing secrets.
pub const BCRYPT_COST: u32 = 12;

const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";

/// Generate a cryptographically secure random secret (client secrets, API keys).
pub fn generate_secret() -> String {
    generate_secret_with_length(DEFAULT_SECRET_LENGTH)
}

pub fn generate_secret_with_length(length: usize) -> String {
    let length = length.max(MIN_SECRET_LENGTH);
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SECRET_CHARSET[rng.gen_range(0..SECRET_CHARSET.len())] as char)
        .collect()
}

/// Hash a secret with bcrypt for at-rest storage.
pub fn hash_secret(secret: &str) -> Result<String, AppError> {
    bcrypt::hash(secret, BCRYPT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("secret hashing failed: {}", e)))
}

/// Verify a secret against its stored bcrypt hash.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, AppError> {
    bcrypt::verify(secret, hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("secret verification failed: {}", e)))
}

// ---------------------------------------------------------------------------
// Opaque token generation/hashing (authorization codes, refresh tokens,
// invitation tokens, password-reset tokens). SHA-256 rather than bcrypt:
// these values are already high-entropy, so a salt buys nothing, and a fast
// deterministic hash lets the repository look them up by an indexed column.
// ---------------------------------------------------------------------------

const TOKEN_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// 256 bits of entropy, URL-safe-alphabet encoded.
pub const DEFAULT_TOKEN_LENGTH: usize = 43;

pub fn generate_opaque_token() -> String {
    generate_opaque_token_with_length(DEFAULT_TOKEN_LENGTH)
}

pub fn generate_opaque_token_with_length(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Base64url(SHA-256(token)), used as the at-rest representation of every
/// opaque token in the system.
pub fn hash_opaque_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub fn verify_opaque_token(token: &str, hash: &str) -> bool {
    constant_time_compare(&hash_opaque_token(token), hash)
}

// ---------------------------------------------------------------------------
// API-key lookup digest. API keys are `prefix.secret`; the secret half is
// too expensive to scan bcrypt-hash by hash, so a deterministic HMAC-SHA256
// of the secret (keyed by a server-side pepper) gives the repository an
// indexable lookup column. The HMAC digest is not itself the security
// boundary — `verify_secret` against the stored bcrypt hash is — it only
// narrows the lookup to candidate rows in constant time relative to the key
// space, not to the stored value.
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_lookup_digest(pepper: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(pepper).expect("HMAC accepts any key length");
    mac.update(secret.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_secret_enforces_minimum_length() {
        assert!(generate_secret().len() >= MIN_SECRET_LENGTH);
        assert!(generate_secret_with_length(10).len() >= MIN_SECRET_LENGTH);
    }

    #[test]
    fn generate_secret_uses_expected_charset() {
        let valid = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";
        for c in generate_secret().chars() {
            assert!(valid.contains(c));
        }
    }

    #[test]
    fn generate_secret_is_unique_per_call() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn hash_secret_roundtrips() {
        let secret = generate_secret();
        let hash = hash_secret(&secret).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_secret(&secret, &hash).unwrap());
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn generate_opaque_token_has_default_length() {
        assert_eq!(generate_opaque_token().len(), DEFAULT_TOKEN_LENGTH);
        assert_eq!(generate_opaque_token_with_length(64).len(), 64);
    }

    #[test]
    fn hash_opaque_token_is_deterministic_and_verifiable() {
        let token = generate_opaque_token();
        let hash = hash_opaque_token(&token);
        assert_eq!(hash, hash_opaque_token(&token));
        assert_ne!(token, hash);
        assert!(verify_opaque_token(&token, &hash));
        assert!(!verify_opaque_token(&generate_opaque_token(), &hash));
    }

    #[test]
    fn hmac_lookup_digest_is_deterministic_for_same_pepper() {
        let pepper = b"test-pepper";
        let d1 = hmac_lookup_digest(pepper, "secret-part");
        let d2 = hmac_lookup_digest(pepper, "secret-part");
        assert_eq!(d1, d2);
        assert_ne!(d1, hmac_lookup_digest(b"other-pepper", "secret-part"));
    }

    #[test]
    fn constant_time_compare_matches_eq() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
