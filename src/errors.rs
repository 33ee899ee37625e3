use sea_orm::error::DbErr;
use thiserror::Error;

/// Error taxonomy for the migration engine.
///
/// Structural failures abort a run; per-record business anomalies never
/// surface here; they are collected in the run summaries' warning
/// lists and the run continues.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Schema missing, unreadable source, malformed migration unit.
    #[error("Structural failure: {0}")]
    Structural(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source feed unreadable: {path}: {source}")]
    SourceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source feed malformed: {path}: {source}")]
    SourceFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// `undo_last` was asked to roll back a step that declares itself
    /// irreversible. The ledger is left untouched; manual recovery
    /// (e.g. restoring from backup) is required.
    #[error("Migration step '{name}' is irreversible: {reason}")]
    Irreversible { name: String, reason: String },

    #[error("No applied migration to undo")]
    NothingToUndo,

    #[error("Unknown migration step '{0}' recorded in ledger")]
    UnknownStep(String),
}

impl MigrateError {
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }
}
