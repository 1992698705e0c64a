//! Batched minting.
//!
//! - [`orchestrator`] - splits items into batches and submits them in order
//! - [`minter`] - the mint collaborator trait and its implementations

pub mod minter;
pub mod orchestrator;

pub use minter::{DryRunMinter, HttpMinter, Minter};
pub use orchestrator::{mint_all, MintConfig, MintReport, MintSummary, PartialFailure};
