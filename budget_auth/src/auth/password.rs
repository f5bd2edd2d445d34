//! Argon2id password hashing with a server-side pepper.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Well-formed Argon2id PHC string with the default cost parameters that
/// matches no password. Verifying against it costs as much as a real check.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// One-way password hashing
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
}

impl PasswordHasher {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash password with Argon2id + pepper
    ///
    /// Each call uses a fresh random salt, so hashing the same password twice
    /// yields different PHC strings.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    ///
    /// Returns `false` on mismatch and on unparsable hashes; the comparison
    /// inside argon2 is constant time.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let peppered = format!("{}{}", password, self.pepper);
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Run a full verification against a hash no password matches
    ///
    /// Used when there is no stored hash to check, so that path takes as long
    /// as a wrong password. Always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        self.verify(password, DUMMY_HASH)
    }
}
