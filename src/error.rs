//! Error taxonomy shared by every layer of the engine.

use crate::config::SettingsError;
use crate::convert::ConversionStage;
use crate::grammar::GrammarError;

/// Result type for engine operations.
pub type EdsResult<T> = Result<T, EdsError>;

/// Errors surfaced by the catalog, compiler, pipeline and engine.
///
/// Nothing is retried internally; storage errors propagate unchanged
/// through [`EdsError::Sqlite`].
#[derive(Debug, thiserror::Error)]
pub enum EdsError {
    /// Unknown type, column, property or connection.
    #[error("{0}")]
    Schema(String),

    /// A display name matches more than one candidate.
    #[error("ambiguous name '{name}' matches {}", .candidates.join(", "))]
    AmbiguousName {
        name: String,
        candidates: Vec<String>,
    },

    /// The filter text could not be parsed completely.
    #[error("query syntax error: {query}")]
    QuerySyntax { query: String },

    /// A value conversion stage failed.
    #[error("cannot convert value of '{column}' in {stage} stage: {message}")]
    Conversion {
        column: String,
        stage: ConversionStage,
        message: String,
    },

    /// A write was rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    /// Storage is not open.
    #[error("{0}")]
    ConnectionState(String),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl EdsError {
    pub(crate) fn unknown(kind: &str, name: &str) -> Self {
        EdsError::Schema(format!("unknown {kind} '{name}'"))
    }
}
