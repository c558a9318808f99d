//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Clone)]
pub struct Config {
    /// HMAC key for session tokens.
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `PAPHOS_JWT_SECRET` | Token signing secret | (required) |
    /// | `PAPHOS_DB_PATH` | SQLite database file | `paphos.db` |
    /// | `PAPHOS_HOST` | Bind host | `0.0.0.0` |
    /// | `PAPHOS_PORT` | Bind port | `3000` |
    /// | `PAPHOS_BCRYPT_COST` | bcrypt work factor | `bcrypt::DEFAULT_COST` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("PAPHOS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::PlaceholderJwtSecret);
        }

        let db_path = lookup("PAPHOS_DB_PATH")
            .unwrap_or_else(|| "paphos.db".into())
            .into();
        let host = lookup("PAPHOS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PAPHOS_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 3000,
        };
        let bcrypt_cost = match lookup("PAPHOS_BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::InvalidBcryptCost(raw))?,
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            jwt_secret,
            db_path,
            host,
            port,
            bcrypt_cost,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(format!("{}:{}", self.host, self.port)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PAPHOS_JWT_SECRET is unset or empty")]
    MissingJwtSecret,

    #[error("PAPHOS_JWT_SECRET is still a placeholder value")]
    PlaceholderJwtSecret,

    #[error("invalid PAPHOS_PORT '{0}'")]
    InvalidPort(String),

    #[error("invalid PAPHOS_BCRYPT_COST '{0}' (expected 4-31)")]
    InvalidBcryptCost(String),

    #[error("invalid bind address '{0}'")]
    InvalidAddr(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_secret_fails_fast() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingJwtSecret)));
        assert!(matches!(
            load(&[("PAPHOS_JWT_SECRET", "")]),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(matches!(
            load(&[("PAPHOS_JWT_SECRET", "dev-secret-change-me")]),
            Err(ConfigError::PlaceholderJwtSecret)
        ));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("PAPHOS_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("paphos.db"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.addr().unwrap().port(), 3000);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        assert!(matches!(
            load(&[("PAPHOS_JWT_SECRET", "s3cret"), ("PAPHOS_PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            load(&[("PAPHOS_JWT_SECRET", "s3cret"), ("PAPHOS_BCRYPT_COST", "2")]),
            Err(ConfigError::InvalidBcryptCost(_))
        ));
    }
}
