//! TOTP enrollment secrets and code validation.

use super::errors::{AuthError, AuthResult};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;

/// Freshly generated enrollment material
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// Base32 secret, stored on the user record
    pub secret: String,
    /// `otpauth://` provisioning URI for QR codes
    pub otpauth_url: String,
    pub issuer: String,
}

/// SHA1 / 6 digits / 30 second TOTP with one step of skew either side
#[derive(Debug, Clone)]
pub struct TotpEngine {
    issuer: String,
}

impl TotpEngine {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Generate a new random secret and its provisioning URI for `account`
    pub fn generate_secret(&self, account: &str) -> AuthResult<TotpEnrollment> {
        let secret = Secret::generate_secret();
        let bytes = secret
            .to_bytes()
            .map_err(|e| AuthError::TotpGeneration(e.to_string()))?;

        let totp = self
            .build(bytes, account)
            .map_err(|e| AuthError::TotpGeneration(e.to_string()))?;

        Ok(TotpEnrollment {
            secret: totp.get_secret_base32(),
            otpauth_url: totp.get_url(),
            issuer: self.issuer.clone(),
        })
    }

    /// Check `code` against `secret` for the current time window
    ///
    /// Undecodable secrets and clock errors count as a failed check.
    pub fn validate(&self, code: &str, secret: &str) -> bool {
        let Some(totp) = self.from_encoded(secret) else {
            return false;
        };

        totp.check_current(code.trim()).unwrap_or(false)
    }

    /// Check `code` at an explicit unix timestamp
    pub fn validate_at(&self, code: &str, secret: &str, unix_secs: u64) -> bool {
        self.from_encoded(secret)
            .is_some_and(|totp| totp.check(code.trim(), unix_secs))
    }

    fn from_encoded(&self, secret: &str) -> Option<TOTP> {
        if secret.is_empty() {
            return None;
        }
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().ok()?;
        // The account name is not part of the code computation
        self.build(bytes, "validation").ok()
    }

    fn build(&self, bytes: Vec<u8>, account: &str) -> Result<TOTP, totp_rs::TotpUrlError> {
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECS,
            bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_at(secret: &str, unix_secs: u64) -> String {
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
        TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "test".to_string())
            .unwrap()
            .generate(unix_secs)
    }

    #[test]
    fn test_generate_secret() {
        let engine = TotpEngine::new("BudgetMax");
        let enrollment = engine.generate_secret("dave@example.com").unwrap();

        assert!(!enrollment.secret.is_empty());
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains("issuer=BudgetMax"));
        assert!(enrollment.otpauth_url.contains(&enrollment.secret));
        assert_eq!(enrollment.issuer, "BudgetMax");
    }

    #[test]
    fn test_secrets_are_unique() {
        let engine = TotpEngine::new("BudgetMax");
        let a = engine.generate_secret("a@example.com").unwrap();
        let b = engine.generate_secret("a@example.com").unwrap();
        assert_ne!(a.secret, b.secret);
    }

    #[test]
    fn test_validate_with_skew() {
        let engine = TotpEngine::new("BudgetMax");
        let secret = engine.generate_secret("erin@example.com").unwrap().secret;
        let t = 1_700_000_010;

        assert!(engine.validate_at(&code_at(&secret, t), &secret, t));
        // One step early or late is tolerated
        assert!(engine.validate_at(&code_at(&secret, t - 30), &secret, t));
        assert!(engine.validate_at(&code_at(&secret, t + 30), &secret, t));
        // Two steps is not
        assert!(!engine.validate_at(&code_at(&secret, t - 90), &secret, t));
    }

    #[test]
    fn test_validate_current_code() {
        let engine = TotpEngine::new("BudgetMax");
        let secret = engine.generate_secret("frank@example.com").unwrap().secret;
        let bytes = Secret::Encoded(secret.clone()).to_bytes().unwrap();
        let code = TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "x".to_string())
            .unwrap()
            .generate_current()
            .unwrap();

        assert!(engine.validate(&code, &secret));
    }

    #[test]
    fn test_invalid_inputs() {
        let engine = TotpEngine::new("BudgetMax");
        let secret = engine.generate_secret("gina@example.com").unwrap().secret;

        assert!(!engine.validate("", &secret));
        assert!(!engine.validate("abcdef", &secret));
        assert!(!engine.validate("123456", ""));
        assert!(!engine.validate("123456", "not base32 !!"));
    }
}
