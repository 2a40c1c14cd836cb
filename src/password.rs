//! Secret hashing and verification using Argon2
//!
//! Uses the argon2id variant with recommended parameters. Secrets are
//! stored as PHC-formatted strings that embed the salt and parameters;
//! nothing recoverable is ever written to the durable store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::TrackerError;

/// Hash a secret using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_secret(secret: &str) -> Result<String, TrackerError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TrackerError::InvalidInput(format!("failed to hash secret: {e}")))
}

/// Verify a secret against a stored hash
///
/// A stored value that is not a valid PHC hash is treated as a non-match,
/// never an error: legacy plaintext records simply cannot log in.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let secret = "correct-horse-battery-staple";
        let hash = hash_secret(secret).unwrap();

        // Hash should be in PHC format
        assert!(hash.starts_with("$argon2"));

        // Correct secret should verify
        assert!(verify_secret(secret, &hash));

        // Wrong secret should not verify
        assert!(!verify_secret("wrong-secret", &hash));
    }

    #[test]
    fn test_different_salts() {
        let secret = "same-secret";
        let hash1 = hash_secret(secret).unwrap();
        let hash2 = hash_secret(secret).unwrap();

        // Same secret should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        // Both should verify
        assert!(verify_secret(secret, &hash1));
        assert!(verify_secret(secret, &hash2));
    }

    #[test]
    fn test_plaintext_record_never_matches() {
        // A legacy record holding the raw secret must not be loginable
        assert!(!verify_secret("admin123", "admin123"));
        assert!(!verify_secret("anything", "not-a-valid-hash"));
    }
}
