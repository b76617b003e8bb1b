//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - SQLite database URL (e.g., `sqlite://cardvault.db`)
//!
//! A `.env` file in the working directory is honored.

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// SQLite database connection URL (may embed credentials when pointed at
    /// a hosted database)
    pub database_url: SecretString,
}

impl CliConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        Ok(Self { database_url })
    }
}
