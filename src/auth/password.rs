/// Password hashing and verification
///
/// Digests are HMAC-SHA256 of the password keyed with the service's hashing
/// secret, stored as 64 lowercase hex characters. Verification re-hashes and
/// compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ValidationError};

type HmacSha256 = Hmac<Sha256>;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Clone)]
pub struct CredentialHasher {
    key: Vec<u8>,
}

impl CredentialHasher {
    pub fn new(hashing_secret: &str) -> Self {
        Self {
            key: hashing_secret.as_bytes().to_vec(),
        }
    }

    /// Digest a secret. `None` if the MAC cannot be keyed.
    pub fn hash(&self, secret: &str) -> Option<String> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key).ok()?;
        mac.update(secret.as_bytes());
        Some(format!("{:x}", mac.finalize().into_bytes()))
    }

    pub fn matches(&self, secret: &str, digest: &str) -> bool {
        match self.hash(secret) {
            Some(computed) => computed.as_bytes().ct_eq(digest.as_bytes()).into(),
            None => false,
        }
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}
