use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use exam_utils::BASIC_ITEM_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub allowed_origin: String,
    pub basic_item_limit: usize,
    pub default_tries: u32,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Defaults for everything but the token secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 8080,
            database_path: "prep.sqlite3".to_string(),
            jwt_secret: jwt_secret.into(),
            allowed_origin: "https://cloud-practitioner.com".to_string(),
            basic_item_limit: BASIC_ITEM_LIMIT,
            default_tries: 1,
            seed_file: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let defaults = Self::with_secret(jwt_secret);

        Ok(Self {
            port: try_load("PORT", defaults.port)?,
            database_path: try_load("DATABASE_PATH", defaults.database_path)?,
            allowed_origin: try_load("ALLOWED_ORIGIN", defaults.allowed_origin)?,
            basic_item_limit: try_load("BASIC_ITEM_LIMIT", defaults.basic_item_limit)?,
            default_tries: try_load("DEFAULT_TRIES", defaults.default_tries)?,
            seed_file: env::var_os("SEED_FILE").map(PathBuf::from),
            jwt_secret: defaults.jwt_secret,
        })
    }
}

fn try_load<T: FromStr + Display>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let Ok(value) = env::var(key) else {
        log::info!("{key} not set, using default: {default}");
        return Ok(default);
    };
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
