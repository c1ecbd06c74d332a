// src/config.rs
use std::env;
use thiserror::Error;

pub const DEFAULT_KEYSPACE: &str = "stock_user_profile";
pub const MEMORY_STORE: &str = "memory";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_connection_uri: String,
    pub keyspace: String,
    pub port: u16,
    pub internal_port: u16,
    pub audience: String,
    pub authorization_server: String,
    pub scope: String,
    pub jwt_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let port = |name: &'static str| {
            let value = required(name)?;
            value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name, value })
        };

        Ok(Config {
            db_connection_uri: required("DB_CONNECTION_URI")?,
            keyspace: lookup("USERPROFILE_KEYSPACE").unwrap_or_else(|| DEFAULT_KEYSPACE.to_string()),
            port: port("PORT")?,
            internal_port: port("PORT_INTERNAL")?,
            audience: required("USERPROFILE_AUDIENCE")?,
            authorization_server: required("AUTHORIZATION_SERVER")?,
            scope: lookup("USERPROFILE_SCOPE").unwrap_or_default(),
            jwt_secret: lookup("USERPROFILE_JWT_SECRET").filter(|s| !s.is_empty()),
        })
    }
}
