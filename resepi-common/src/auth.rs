//! Password hashing and session tokens
//!
//! Passwords are stored as salted, iterated SHA-256 (hex) next to their
//! salt in the `users` table. Session tokens are random 256-bit values;
//! only their SHA-256 digest is persisted.
//!
//! These are pure functions with no HTTP framework dependencies; the web
//! crate wraps them in extractors and cookies.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash rounds for password stretching
const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LEN: usize = 8;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn random_hex(len_bytes: usize) -> String {
    let mut buf = vec![0u8; len_bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    to_hex(&buf)
}

/// Generate a 128-bit random salt as 32 hex characters
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Hash a password with its salt
///
/// # Examples
///
/// ```
/// use resepi_common::auth::hash_password;
///
/// let hash = hash_password("rahsia123", "00ff");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_password("rahsia123", "00ff"));
/// assert_ne!(hash, hash_password("rahsia123", "00fe"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hasher.finalize()
    };

    for _ in 1..PASSWORD_HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

/// Constant-time comparison of a candidate password against a stored hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), expected_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Generate a session token (64 hex characters) for the client cookie
pub fn generate_session_token() -> String {
    random_hex(32)
}

/// Generate an opaque token for unsubscribe links
pub fn generate_link_token() -> String {
    random_hex(16)
}

/// Digest of a session token as stored in the `sessions` table
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
