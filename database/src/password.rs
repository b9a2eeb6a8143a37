//! Password hashing and verification using argon2id.

use crate::errors::{Error, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

/// Hash a password with a fresh random salt. The result is a PHC string
/// carrying the algorithm, parameters and salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. A malformed stored hash never
/// verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("mysecret").unwrap();
        assert!(verify_password("mysecret", &hash));
        assert!(!verify_password("wrongpassword", &hash));
    }

    #[test]
    fn test_same_password_different_salts() {
        let h1 = hash_password("password").unwrap();
        let h2 = hash_password("password").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("password", &h1));
        assert!(verify_password("password", &h2));
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("secret").unwrap();
        assert_ne!(hash, "secret");
        assert!(!hash.contains("secret"));
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.len() <= 128);
    }

    #[test]
    fn test_malformed_hash() {
        assert!(!verify_password("secret", "secret"));
        assert!(!verify_password("secret", ""));
    }
}
