//! # nftmint - HIP-412 NFT metadata preparation and batched minting
//!
//! nftmint turns a CSV describing an NFT collection into HIP-412 metadata
//! files, validates them, and mints tokens in bounded, strictly ordered
//! batches through a mint collaborator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Converter  │────▶│  Validator  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (layout)   │     │  (HIP-412)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            ▼
//!                     │   Minter    │◀────│ Orchestrator│◀──── metadata / URIs
//!                     │ (HTTP, dry) │     │  (batches)  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nftmint::{mint_batched, DryRunMinter, MintConfig, MintRequest, MintSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = MintRequest {
//!         config: MintConfig::new("0.0.1234", "supply-key", 10)?,
//!         source: MintSource::Shared { metadata: "ipfs://meta.json".into(), amount: 25 },
//!     };
//!     let outcomes = mint_batched(request, &DryRunMinter::new()).await?.into_result()?;
//!     println!("Minted {} tokens", outcomes.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Header layout and environment settings
//! - [`models`] - Domain models (MetadataObject, MintItem, TokenId)
//! - [`parser`] - CSV parsing with auto-detection
//! - [`validation`] - HIP-412 structural validation
//! - [`transform`] - Row conversion, persistence and pipeline
//! - [`mint`] - Batch orchestrator and mint collaborators
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Minting
pub mod mint;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, MintError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Configuration and models
// =============================================================================

pub use config::{HeaderLayout, Settings};
pub use models::{
    Attribute, AttributeValue, MetadataObject, MintItem, MintOutcome, SerialNumber, SupplyKey,
    TokenId, HIP412_FORMAT,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, detect_encoding, parse_bytes, read_rows, read_uris, CsvRow, ParsedRows,
    ReadOptions,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate, validate_many, BatchValidationReport, MissingAttributeError, MissingCause,
    ValidationErrorKind, ValidationResult,
};

// =============================================================================
// Re-exports - Pipeline and minting
// =============================================================================

pub use mint::{
    mint_all, DryRunMinter, HttpMinter, MintConfig, MintReport, MintSummary, Minter,
    PartialFailure,
};
pub use transform::pipeline::{
    create_metadata_from_rows, mint_batched, read_metadata_files, CreateMetadataErrors,
    CreateMetadataOptions, CreateMetadataReport, MetadataSource, MintRequest, MintSource,
};
