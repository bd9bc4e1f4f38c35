/// Token authority
///
/// Issues, validates, refreshes and revokes bearer tokens. Holds only
/// configuration and shared handles, so clones are cheap and every call is
/// independent of every other.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::claims::{Claims, Header, Identity};
use crate::auth::clock::Clock;
use crate::auth::codec;
use crate::auth::revocation::RevocationLedger;
use crate::auth::signer;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};
use crate::store::DocumentStore;

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }

    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

#[derive(Clone)]
pub struct TokenAuthority {
    settings: AuthSettings,
    ledger: RevocationLedger,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    pub fn new(settings: AuthSettings, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            ledger: RevocationLedger::new(store),
            clock,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Sign a new token for an identity whose password was already checked.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        let claims = Claims::new(identity, self.clock.now(), self.settings.token_ttl());
        let signing_input = codec::encode(&Header::new(self.settings.algorithm), &claims)?;
        let signature = signer::sign_input(
            &signing_input,
            self.settings.algorithm,
            &self.settings.hashing_secret,
        )?;

        tracing::debug!(user_id = %claims.sub, jti = %claims.jti, "Token issued");

        Ok(IssuedToken {
            token: format!("{}{}{}", signing_input, codec::DELIMITER, signature),
            claims,
        })
    }

    /// Check a presented token: structure, revocation, signature, expiry, in
    /// that order. The first failing check decides the outcome.
    pub async fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let decoded = codec::decode(token).map_err(|e| {
            tracing::debug!("Rejected malformed token");
            AppError::Auth(e)
        })?;

        let lookup = self.ledger.is_revoked(token).await;
        if self.settings.revocation_check_failure.resolve(lookup)? {
            tracing::debug!(jti = %decoded.claims.jti, "Rejected revoked token");
            return Err(AppError::Auth(AuthError::TokenRevoked));
        }

        if !signer::verify_decoded(&decoded, &self.settings.hashing_secret) {
            tracing::warn!("Rejected token with bad signature");
            return Err(AppError::Auth(AuthError::SignatureMismatch));
        }

        if decoded.claims.is_expired_at(self.clock.now()) {
            tracing::debug!(jti = %decoded.claims.jti, "Rejected expired token");
            return Err(AppError::Auth(AuthError::TokenExpired));
        }

        Ok(decoded.claims)
    }

    /// Re-issue for the same identity. The presented token must be valid;
    /// it is revoked afterwards only when `refresh_revokes_source` is set.
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, AppError> {
        let claims = self.validate(token).await?;
        let issued = self.issue(&claims.identity()?)?;

        if self.settings.refresh_revokes_source {
            self.ledger
                .revoke(token, self.clock.now(), claims.expires_at())
                .await?;
        }

        tracing::info!(user_id = %claims.sub, "Token refreshed");
        Ok(issued)
    }

    /// Denylist a token. It only has to decode; expired tokens are accepted.
    ///
    /// The entry's expiry is capped at one TTL from now. A genuine token can
    /// never outlive that, and a forged far-future `exp` cannot pin an entry
    /// in the ledger forever.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let decoded = codec::decode(token)?;
        let now = self.clock.now();
        let expires_at = decoded.claims.expires_at().min(now + self.settings.token_ttl());

        self.ledger.revoke(token, now, expires_at).await?;

        tracing::info!(jti = %decoded.claims.jti, "Token revoked");
        Ok(())
    }

    /// Compact the revocation ledger.
    pub async fn purge_revocations(&self) -> Result<usize, AppError> {
        Ok(self.ledger.purge_expired(self.clock.now()).await?)
    }
}
