//! Error types for the nftmint pipeline.
//!
//! Fatal errors form a small hierarchy:
//!
//! - [`CsvError`] - reading and parsing delimited sources
//! - [`ConfigError`] - input-contract violations caught before any work starts
//! - [`MintError`] - failures reported by the mint collaborator
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP API errors
//!
//! Structural validation problems are *not* errors in this sense; they are
//! reported as data (see [`crate::validation`]). A failed minting run is
//! reported as [`crate::mint::PartialFailure`], which keeps the outcomes
//! minted before the failing batch.

use thiserror::Error;

use crate::mint::PartialFailure;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading a delimited source.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV record.
    #[error("Invalid CSV format at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A cell that cannot be used as metadata content.
    #[error("Invalid data at line {line}: {value}")]
    InvalidData { line: u64, value: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::Io(io),
            _ => CsvError::Parse { line, message },
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Input-contract violations, raised before any batch is submitted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Missing required token id")]
    MissingTokenId,

    #[error("Missing required supply key")]
    MissingSupplyKey,

    #[error("Missing metadata to mint")]
    MissingMetadata,

    #[error("Invalid mint service endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Mint Collaborator Errors
// =============================================================================

/// Failure of one call to the mint collaborator.
///
/// The collaborator is all-or-nothing per batch, so any of these means that
/// no item of the submitted batch was minted.
#[derive(Debug, Error)]
pub enum MintError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The mint service answered with a non-success status.
    #[error("Mint service rejected the batch ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Metadata could not be encoded for submission.
    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// The collaborator returned a different number of serials than items.
    #[error("Expected {expected} serial numbers, received {actual}")]
    SerialCountMismatch { expected: usize, actual: usize },

    /// Any other collaborator failure.
    #[error("{0}")]
    Collaborator(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Returned by [`crate::transform::pipeline::create_metadata_from_rows`] and
/// [`crate::transform::pipeline::mint_batched`]. Conversion is automatic via
/// `From`, so `?` works across layers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    PartialMint(#[from] PartialFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for one mint collaborator call.
pub type MintResult<T> = Result<T, MintError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let config_err = ConfigError::InvalidBatchSize;
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_invalid_data_format() {
        let err = CsvError::InvalidData {
            line: 3,
            value: "not a uri".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("not a uri"));
    }

    #[test]
    fn test_csv_error_keeps_line() {
        let data = "a,b\n1,2\n1,2,3\n";
        let mut reader = csv::ReaderBuilder::new()
            .flexible(false)
            .from_reader(data.as_bytes());
        let err = reader
            .records()
            .find_map(|r| r.err())
            .map(CsvError::from)
            .expect("unequal record lengths must fail");

        match err {
            CsvError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
