/// Input validators module
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Format checks for phone numbers and check URLs
/// 3. Range checks for check settings

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_NAME_LENGTH: usize = 256;
const MAX_URL_LENGTH: usize = 2048;
pub const MIN_TIMEOUT_SECONDS: u8 = 1;
pub const MAX_TIMEOUT_SECONDS: u8 = 5;

lazy_static! {
    // Digits only, optional leading +, E.164 length range
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();

    // Host with optional port and path; the scheme lives in its own field
    static ref URL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*(?::[0-9]{1,5})?(?:/[^\s]*)?$"
    ).unwrap();
}

/// Unwraps a required string field, trimming it and rejecting blanks.
pub fn required(value: Option<&str>, field: &str) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::EmptyField(field.to_string())),
    }
}

pub fn is_valid_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone".to_string()));
    }

    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a first or last name
/// - Checks length constraints
/// - Rejects control characters
pub fn is_valid_name(name: &str, field: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates the target of a check, written without its scheme
/// (`example.com/health`).
pub fn is_valid_url(url: &str) -> Result<String, ValidationError> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("url".to_string()));
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong("url".to_string(), MAX_URL_LENGTH));
    }

    if trimmed.contains("://") || !URL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("url".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Status codes a check treats as up. Must be non-empty real HTTP codes.
pub fn is_valid_success_codes(codes: &[u16]) -> Result<Vec<u16>, ValidationError> {
    if codes.is_empty() {
        return Err(ValidationError::EmptyField("successCodes".to_string()));
    }

    if codes.iter().any(|code| !(100..=599).contains(code)) {
        return Err(ValidationError::OutOfRange("successCodes".to_string()));
    }

    let mut codes = codes.to_vec();
    codes.sort_unstable();
    codes.dedup();
    Ok(codes)
}

pub fn is_valid_timeout(seconds: u8) -> Result<u8, ValidationError> {
    if (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(ValidationError::OutOfRange("timeoutInSeconds".to_string()))
    }
}
