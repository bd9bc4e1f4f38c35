/// Token header and claims
///
/// Field names follow the JWT registered claim names (RFC 7519) plus
/// `contact`, the routing key of the owning user record.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Algorithm;
use crate::error::AppError;

/// Fixed `typ` discriminator for every token this service issues
pub const TOKEN_TYPE: &str = "JWT";

const NONCE_LENGTH: usize = 16;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Header {
    /// Name of the signing algorithm. Kept as text so an unknown name
    /// surfaces as a failed signature check, not a parse error.
    pub alg: String,
    pub typ: String,
}

impl Header {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            alg: algorithm.name().to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Who a token speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    /// Phone number the user record is stored under
    pub contact: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Routing key of the user record
    pub contact: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Random nonce; two tokens issued in the same second still differ
    pub jti: String,
}

impl Claims {
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: identity.user_id.to_string(),
            contact: identity.contact.clone(),
            iat,
            exp: iat + ttl.num_seconds(),
            jti: generate_nonce(),
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }

    pub fn identity(&self) -> Result<Identity, AppError> {
        Ok(Identity {
            user_id: self.user_id()?,
            contact: self.contact.clone(),
        })
    }

    /// A token stops being valid at the instant `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `exp` must come strictly after `iat`.
    pub fn has_valid_window(&self) -> bool {
        self.exp > self.iat
    }
}

fn generate_nonce() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}
