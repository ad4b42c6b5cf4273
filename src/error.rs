//! Error types for the Calm Cycle engine
//!
//! The derivation, statistics, prediction and risk operations are total and never
//! fail. Errors only arise at the boundary: parsing dates, decoding JSON documents
//! and validating configuration or input.

use thiserror::Error;

/// Errors that can occur at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Date parse error: {0}")]
    DateParse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
