use std::env;

use thiserror::Error;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MATINEE_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("MATINEE_SERVER_PORT is not a valid port: {0}")]
    InvalidPort(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("MATINEE_SERVER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url =
            env::var("MATINEE_DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self { port, database_url })
    }
}
