/// Token codec
///
/// `base64url(header) "." base64url(claims) "." base64url(signature)`, no
/// padding. Pure functions only; signing lives in `signer`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::{Claims, Header, TOKEN_TYPE};
use crate::error::{AppError, AuthError};

pub const DELIMITER: char = '.';

/// A token split into its parts, header and claims parsed
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: Header,
    pub claims: Claims,
    /// `encodedHeader "." encodedClaims` exactly as presented
    pub signing_input: String,
    /// Encoded signature exactly as presented
    pub signature: String,
}

pub fn encode_segment<T: Serialize>(value: &T) -> Result<String, AppError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AppError::Internal(format!("Token serialization failed: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Encode header and claims into the signing input `encodedHeader.encodedClaims`.
pub fn encode(header: &Header, claims: &Claims) -> Result<String, AppError> {
    Ok(format!(
        "{}{}{}",
        encode_segment(header)?,
        DELIMITER,
        encode_segment(claims)?
    ))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

/// Split and parse a token. Anything other than three segments with a
/// parseable header and claims is `MalformedToken`.
pub fn decode(token: &str) -> Result<DecodedToken, AuthError> {
    let parts: Vec<&str> = token.split(DELIMITER).collect();
    if parts.len() != 3 {
        return Err(AuthError::MalformedToken);
    }

    let header: Header = decode_segment(parts[0])?;
    let claims: Claims = decode_segment(parts[1])?;

    if header.typ != TOKEN_TYPE || !claims.has_valid_window() {
        return Err(AuthError::MalformedToken);
    }

    Ok(DecodedToken {
        header,
        claims,
        signing_input: format!("{}{}{}", parts[0], DELIMITER, parts[1]),
        signature: parts[2].to_string(),
    })
}
