//! Store error types for `oathsim-store`.

use oathsim_core::OcraError;
use thiserror::Error;

/// Errors produced by credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Validation failure delegated from the core engine.
    #[error(transparent)]
    Core(#[from] OcraError),

    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Credential not found by name.
    #[error("credential not found: {0}")]
    NotFound(String),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Record carries a schema version no registered migration can upgrade.
    #[error("unsupported schema version: {0}")]
    UnsupportedSchemaVersion(u32),

    /// Record carries an unknown credential type token.
    #[error("unsupported credential type: {0}")]
    UnsupportedCredentialType(String),

    /// Record is missing a required attribute.
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// Record attribute failed to parse.
    #[error("invalid attribute {attribute}: {reason}")]
    InvalidAttribute {
        /// Attribute key.
        attribute: String,
        /// Parse failure detail.
        reason: String,
    },

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}
