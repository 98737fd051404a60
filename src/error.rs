//! Error types.
//!
//! Only invalid configuration and unreadable config files surface as
//! errors to callers. Definition and collaborator errors are turned into
//! summary notes or "evidence absent" inside a run.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fallible boundary operations.
pub type RelmapResult<T> = Result<T, ConfigError>;

/// Invalid configuration, rejected before analysis starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_confidence must be within [0, 1], got {0}")]
    MinConfidence(f64),

    #[error("timeout must be a non-negative number of seconds, got {0}")]
    Timeout(f64),

    #[error("probe timeout must be a positive number of seconds, got {0}")]
    ProbeTimeout(f64),

    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("threshold {field} is out of range: {value}")]
    Threshold { field: &'static str, value: f64 },

    #[error("invalid exclusion pattern '{pattern}': {message}")]
    ExclusionPattern { pattern: String, message: String },
}

/// A single malformed table or column definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("table definition #{index} is not an object")]
    NotAnObject { index: usize },

    #[error("table definition #{index} is missing a table name")]
    MissingTableName { index: usize },

    #[error("unable to parse table name from '{0}'")]
    UnparseableName(String),

    #[error("table '{0}' has no usable columns")]
    NoColumns(String),

    #[error("column #{index} of table '{table}' is missing a name")]
    MissingColumnName { table: String, index: usize },

    #[error("column #{index} of table '{table}' is not an object")]
    ColumnNotAnObject { table: String, index: usize },

    #[error("duplicate table '{0}' ignored")]
    DuplicateTable(String),

    #[error("duplicate column '{column}' in table '{table}' ignored")]
    DuplicateColumn { table: String, column: String },

    #[error("table definitions must be a JSON array or an object with a 'tables' array")]
    NotAList,
}

/// Failure of the injected NULL probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("null probe timed out after {0} ms")]
    Timeout(u64),

    #[error("null probe failed: {0}")]
    Failed(String),
}

/// Failure of the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(String),

    #[error("sample fetch for {table}.{column} failed: {message}")]
    Sample {
        table: String,
        column: String,
        message: String,
    },
}

/// Errors loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
