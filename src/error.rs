//! Error types for the agenda engine.

use thiserror::Error;

/// Main error type for agenda operations.
#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid occurrence id: {0}")]
    InvalidOccurrenceId(String),

    #[error("Series not found: {0}")]
    SeriesNotFound(i64),

    #[error("Scope not supported: {0}")]
    UnsupportedScope(String),

    #[error("Expansion range too large: would produce more than {max} occurrences")]
    RangeTooLarge { max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Recurrence rule and payload validation errors.
///
/// Rules are validated once at the boundary; expansion assumes a valid rule.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Interval must be >= 1, got {0}")]
    InvalidInterval(u32),

    #[error("Occurrence count must be >= 1, got {0}")]
    InvalidCount(u32),

    #[error("Recurrence end date {end} is before the series start {start}")]
    EndBeforeStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Invalid weekday index: {0} (expected 0..=6, 0=Sunday)")]
    InvalidWeekday(String),

    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("Unknown recurrence end type: {0}")]
    UnknownEndType(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Storage-related errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Visit not found: {0}")]
    VisitNotFound(i64),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for agenda operations.
pub type Result<T> = std::result::Result<T, AgendaError>;
