use mongodb::bson;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("Missing field in store response: {0}")]
    MissingField(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Index {0} already exists with different keys")]
    IndexConflict(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
