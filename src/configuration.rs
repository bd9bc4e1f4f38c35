use chrono::Duration;

use crate::auth::{Algorithm, StorageFailurePolicy};
use crate::error::ConfigError;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Hashing secret used when none is configured. Refused in production.
pub const DEVELOPMENT_HASHING_SECRET: &str =
    "secretSalt--6ef579e83beb75a937d5ade07a11bce5--should_only_be_used_in_tests";

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub base_dir: String,
}

/// Token and credential settings
///
/// Passed explicitly to `TokenAuthority` and `CredentialHasher`; nothing in
/// the auth module reads configuration on its own.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// Key for password digests and token signatures
    pub hashing_secret: String,
    /// Token lifetime in seconds (3600 = 1 hour)
    pub token_ttl_seconds: i64,
    /// Signing algorithm written into issued token headers
    pub algorithm: Algorithm,
    /// Revoke the presented token when a refreshed one is issued
    pub refresh_revokes_source: bool,
    /// How a storage fault during the revocation check is treated
    pub revocation_check_failure: StorageFailurePolicy,
    /// Interval of the expired revocation entry purge, in seconds
    pub revocation_purge_interval_seconds: u64,
}

impl AuthSettings {
    /// Clamped to `1..=MAX_TOKEN_TTL_SECONDS`; `validate` rejects anything outside.
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_seconds.clamp(1, MAX_TOKEN_TTL_SECONDS))
    }
}

/// Runtime environment, selected by `APP_ENVIRONMENT`
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Environment::Development => 4000,
            Environment::Production => 5000,
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue(format!(
                "{} is not a supported environment, use `development` or `production`",
                other
            ))),
        }
    }
}

impl Settings {
    /// Reject settings the service must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.hashing_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.hashing_secret".to_string()));
        }
        if self.auth.token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.auth.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token_ttl_seconds must be at most {}",
                MAX_TOKEN_TTL_SECONDS
            )));
        }
        if self.auth.revocation_purge_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.revocation_purge_interval_seconds must be positive".to_string(),
            ));
        }
        if self.application.environment == Environment::Production
            && self.auth.hashing_secret == DEVELOPMENT_HASHING_SECRET
        {
            return Err(ConfigError::InvalidValue(
                "auth.hashing_secret must be set explicitly in production".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::File && self.storage.base_dir.trim().is_empty() {
            return Err(ConfigError::MissingRequired("storage.base_dir".to_string()));
        }
        Ok(())
    }
}

/// Load settings: defaults, then `configuration.yaml`, then
/// `configuration/<environment>.yaml`, then `APP_*` environment variables
/// (`APP_AUTH__HASHING_SECRET`, `APP_APPLICATION__PORT`, ...).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()?;

    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", environment.default_port() as i64)?
        .set_default("application.environment", environment.as_str())?
        .set_default("storage.backend", "file")?
        .set_default("storage.base_dir", ".data")?
        .set_default("auth.hashing_secret", DEVELOPMENT_HASHING_SECRET)?
        .set_default("auth.token_ttl_seconds", 3600_i64)?
        .set_default("auth.algorithm", "HS256")?
        .set_default("auth.refresh_revokes_source", false)?
        .set_default("auth.revocation_check_failure", "fail_closed")?
        .set_default("auth.revocation_purge_interval_seconds", 600_i64)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::File::with_name(&format!("configuration/{}", environment.as_str()))
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            application: ApplicationSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: Environment::Development,
            },
            storage: StorageSettings {
                backend: StorageBackend::Memory,
                base_dir: String::new(),
            },
            auth: AuthSettings {
                hashing_secret: DEVELOPMENT_HASHING_SECRET.to_string(),
                token_ttl_seconds: 3600,
                algorithm: Algorithm::HS256,
                refresh_revokes_source: false,
                revocation_check_failure: StorageFailurePolicy::FailClosed,
                revocation_purge_interval_seconds: 600,
            },
        }
    }

    #[test]
    fn test_default_development_settings_are_valid() {
        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let mut settings = test_settings();
        settings.auth.hashing_secret = "  ".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let mut settings = test_settings();
        settings.auth.token_ttl_seconds = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let mut settings = test_settings();
        settings.auth.token_ttl_seconds = MAX_TOKEN_TTL_SECONDS;
        assert!(settings.validate().is_ok());

        settings.auth.token_ttl_seconds = MAX_TOKEN_TTL_SECONDS + 1;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));

        settings.auth.token_ttl_seconds = i64::MAX / 100;
        assert!(settings.validate().is_err());
        assert_eq!(settings.auth.token_ttl(), Duration::seconds(MAX_TOKEN_TTL_SECONDS));
    }

    #[test]
    fn test_development_secret_refused_in_production() {
        let mut settings = test_settings();
        settings.application.environment = Environment::Production;
        assert!(settings.validate().is_err());

        settings.auth.hashing_secret = "a-real-production-secret".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_backend_needs_base_dir() {
        let mut settings = test_settings();
        settings.storage.backend = StorageBackend::File;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::try_from("Production".to_string()).unwrap(),
            Environment::Production
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
        assert_eq!(Environment::Development.default_port(), 4000);
    }

    #[test]
    fn test_token_ttl() {
        assert_eq!(test_settings().auth.token_ttl(), Duration::hours(1));
    }
}
