//! Connection target configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HOST_VAR: &str = "BOOKSTORE_HOST";
pub const PORT_VAR: &str = "BOOKSTORE_PORT";
pub const DATABASE_VAR: &str = "BOOKSTORE_DATABASE";
pub const COLLECTION_VAR: &str = "BOOKSTORE_COLLECTION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port {0:?}: expected an integer between 0 and 65535")]
    InvalidPort(String),
}

/// Where the book collection lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Host name or address of the document store.
    pub host: String,
    /// TCP port of the document store.
    pub port: u16,
    /// Database holding the collection.
    pub database: String,
    /// Collection the books are written to and read from.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 27017,
            database: "plp_bookstore".to_string(),
            collection: "books".to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads the `BOOKSTORE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            port,
            database: lookup(DATABASE_VAR).unwrap_or(defaults.database),
            collection: lookup(COLLECTION_VAR).unwrap_or(defaults.collection),
        })
    }

    /// Connection string for the driver.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}
