/// Token signing and verification
///
/// HMAC over `encodedHeader "." encodedClaims` with the shared secret. The
/// verifier uses the algorithm the token's own header names; only the HMAC
/// family is accepted, so `none` and asymmetric names simply fail.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::auth::codec::{self, DecodedToken, DELIMITER};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HS256" => Some(Algorithm::HS256),
            "HS384" => Some(Algorithm::HS384),
            "HS512" => Some(Algorithm::HS512),
            _ => None,
        }
    }
}

fn mac(algorithm: Algorithm, secret: &[u8], input: &[u8]) -> Option<Vec<u8>> {
    let digest = match algorithm {
        Algorithm::HS256 => {
            let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).ok()?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::HS384 => {
            let mut mac = <HmacSha384 as Mac>::new_from_slice(secret).ok()?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::HS512 => {
            let mut mac = <HmacSha512 as Mac>::new_from_slice(secret).ok()?;
            mac.update(input);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Some(digest)
}

/// Sign an already-joined `encodedHeader.encodedClaims`.
pub fn sign_input(signing_input: &str, algorithm: Algorithm, secret: &str) -> Result<String, AppError> {
    mac(algorithm, secret.as_bytes(), signing_input.as_bytes())
        .map(|digest| URL_SAFE_NO_PAD.encode(digest))
        .ok_or_else(|| AppError::Internal("Token signing key rejected".to_string()))
}

pub fn sign(
    encoded_header: &str,
    encoded_claims: &str,
    algorithm: Algorithm,
    secret: &str,
) -> Result<String, AppError> {
    sign_input(
        &format!("{}{}{}", encoded_header, DELIMITER, encoded_claims),
        algorithm,
        secret,
    )
}

/// Check the signature of an already-decoded token.
pub fn verify_decoded(decoded: &DecodedToken, secret: &str) -> bool {
    let Some(algorithm) = Algorithm::from_name(&decoded.header.alg) else {
        return false;
    };
    match sign_input(&decoded.signing_input, algorithm, secret) {
        Ok(expected) => expected.as_bytes().ct_eq(decoded.signature.as_bytes()).into(),
        Err(_) => false,
    }
}

/// `true` only for a well-formed token whose signature matches. Never errors.
pub fn verify(token: &str, secret: &str) -> bool {
    match codec::decode(token) {
        Ok(decoded) => verify_decoded(&decoded, secret),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Claims, Header, Identity};
    use chrono::{Duration, Utc};

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn signed_token(algorithm: Algorithm, secret: &str) -> String {
        let identity = Identity {
            user_id: uuid::Uuid::new_v4(),
            contact: "5551234567".to_string(),
        };
        let claims = Claims::new(&identity, Utc::now(), Duration::hours(1));
        let input = codec::encode(&Header::new(algorithm), &claims).unwrap();
        let signature = sign_input(&input, algorithm, secret).unwrap();
        format!("{}.{}", input, signature)
    }

    #[test]
    fn test_sign_and_verify() {
        for algorithm in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let token = signed_token(algorithm, SECRET);
            assert!(verify(&token, SECRET), "{} token should verify", algorithm.name());
        }
    }

    #[test]
    fn test_sign_matches_joined_input() {
        let a = sign("aGVhZA", "Y2xhaW1z", Algorithm::HS256, SECRET).unwrap();
        let b = sign_input("aGVhZA.Y2xhaW1z", Algorithm::HS256, SECRET).unwrap();
        assert_eq!(a, b);
        // 32 byte digest, base64url without padding
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = signed_token(Algorithm::HS256, SECRET);
        assert!(!verify(&token, "another-secret"));
    }

    #[test]
    fn test_any_header_or_claims_mutation_fails() {
        let token = signed_token(Algorithm::HS256, SECRET);
        let signature_start = token.rfind('.').unwrap();

        for (index, original) in token.char_indices() {
            if index >= signature_start || original == '.' {
                continue;
            }
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + 1, &replacement.to_string());
            assert!(!verify(&tampered, SECRET), "mutation at {} verified", index);
        }
    }

    #[test]
    fn test_tampered_signature_fails() {
        let token = signed_token(Algorithm::HS256, SECRET);
        assert!(!verify(&format!("{}X", token), SECRET));
    }

    #[test]
    fn test_unsupported_algorithm_fails() {
        let identity = Identity {
            user_id: uuid::Uuid::new_v4(),
            contact: "5551234567".to_string(),
        };
        let claims = Claims::new(&identity, Utc::now(), Duration::hours(1));
        let header = Header {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        };
        let input = codec::encode(&header, &claims).unwrap();

        assert!(!verify(&format!("{}.", input), SECRET));
        let forged = sign_input(&input, Algorithm::HS256, SECRET).unwrap();
        assert!(!verify(&format!("{}.{}", input, forged), SECRET));
    }

    #[test]
    fn test_malformed_token_is_false_not_error() {
        assert!(!verify("only.two", SECRET));
        assert!(!verify("", SECRET));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(Algorithm::from_name("HS384"), Some(Algorithm::HS384));
        assert_eq!(Algorithm::from_name("RS256"), None);
        assert_eq!(Algorithm::HS512.name(), "HS512");
    }
}
