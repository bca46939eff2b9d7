use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::security;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("unsupported JWT algorithm {0:?} (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
}

/// Token issuing and validation settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    /// Cookie the token is also accepted from (and set on login).
    pub cookie_name: String,
    pub token_ttl: Duration,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
    /// True when the secret was generated for this process only.
    pub ephemeral_secret: bool,
}

impl AuthConfig {
    /// HS256 config with the default cookie and lifetime.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            cookie_name: "access_token".to_string(),
            token_ttl: Duration::from_secs(15 * 60),
            password_cost: bcrypt::DEFAULT_COST,
            ephemeral_secret: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let (secret, ephemeral_secret) = match std::env::var("JWT_SECRET_KEY") {
            Ok(secret) if !secret.is_empty() => (secret, false),
            _ => (security::random_token(64), true),
        };

        let algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(name) => parse_algorithm(&name)?,
            Err(_) => Algorithm::HS256,
        };

        let cookie_name =
            std::env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "access_token".to_string());

        let token_ttl = parse_ttl(std::env::var("JWT_TTL_MINUTES").ok())?;

        let password_cost: u32 = parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&password_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: password_cost.to_string(),
            });
        }

        Ok(Self {
            secret,
            algorithm,
            cookie_name,
            token_ttl,
            password_cost,
            ephemeral_secret,
        })
    }
}

fn parse_ttl(value: Option<String>) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(15 * 60));
    };
    let minutes = value.trim().parse::<u64>().ok();
    minutes
        .and_then(|minutes| minutes.checked_mul(60))
        .map(Duration::from_secs)
        .ok_or(ConfigError::Invalid {
            name: "JWT_TTL_MINUTES",
            value,
        })
}

fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::UnsupportedAlgorithm(name.to_string())),
    }
}

/// Server configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Empty means any origin, without credentials.
    pub allowed_origins: Vec<String>,
    pub debug: bool,
    pub max_connections: u32,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:picross.db?mode=rwc".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let debug = std::env::var("DEBUG")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            port: parse_var("PORT", 8080)?,
            allowed_origins,
            debug,
            max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            auth: AuthConfig::from_env()?,
        })
    }

    /// Single connection in-memory database, for tests and local experiments.
    pub fn in_memory(auth: AuthConfig) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            allowed_origins: Vec::new(),
            debug: false,
            max_connections: 1,
            auth,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "True" | "true" | "1")
}
