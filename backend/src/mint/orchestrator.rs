//! Sequential batch minting.
//!
//! ```text
//! items ──chunks(batch_size)──▶ batch 1 ─submit─▶ serials ─┐
//!                               batch 2 ─submit─▶ serials ─┼─▶ Completed(outcomes)
//!                               batch 3 ─submit─▶ error ───┴─▶ Aborted(PartialFailure)
//! ```
//!
//! Batches never overlap and are submitted one at a time: batch `k + 1` starts
//! only after batch `k` resolved, because every batch is signed with the same
//! supply key and serial numbers must follow submission order. A failed batch
//! ends the run; nothing is retried here.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::minter::Minter;
use crate::error::{ConfigError, ConfigResult, MintError};
use crate::models::{MintItem, MintOutcome, SupplyKey, TokenId};

/// Validated parameters of a minting run.
#[derive(Debug, Clone)]
pub struct MintConfig {
    token_id: TokenId,
    supply_key: SupplyKey,
    batch_size: usize,
}

impl MintConfig {
    /// Rejects a blank token id, a blank supply key and a zero batch size.
    pub fn new(
        token_id: impl Into<String>,
        supply_key: impl Into<String>,
        batch_size: usize,
    ) -> ConfigResult<Self> {
        let token_id = TokenId::new(token_id)?;
        let supply_key = SupplyKey::new(supply_key)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(Self {
            token_id,
            supply_key,
            batch_size,
        })
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn supply_key(&self) -> &SupplyKey {
        &self.supply_key
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `ceil(item_count / batch_size)`.
    pub fn number_of_batches(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.batch_size)
    }
}

/// A run that stopped on a failing batch.
///
/// `minted` holds every outcome from the batches before `failed_batch`, so a
/// caller can resume from `minted.len()` without querying the ledger.
#[derive(Debug, Error)]
#[error(
    "Minting failed on batch {failed_batch}: {cause}. Already minted ({}): {}",
    .minted.len(),
    summarize(.minted)
)]
pub struct PartialFailure {
    pub minted: Vec<MintOutcome>,
    /// 1-based number of the batch that failed.
    pub failed_batch: usize,
    #[source]
    pub cause: MintError,
}

fn summarize(minted: &[MintOutcome]) -> String {
    if minted.is_empty() {
        return "nothing".to_string();
    }
    minted
        .iter()
        .map(|o| format!("#{} {}", o.serial_number, o.content))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminal state of a minting run.
#[derive(Debug)]
#[must_use]
pub enum MintReport {
    /// Every item minted; outcomes in input order.
    Completed(Vec<MintOutcome>),
    /// A batch failed; see [`PartialFailure::minted`] for what got through.
    Aborted(PartialFailure),
}

impl MintReport {
    /// Outcomes minted by this run, complete or not.
    pub fn minted(&self) -> &[MintOutcome] {
        match self {
            MintReport::Completed(outcomes) => outcomes,
            MintReport::Aborted(failure) => &failure.minted,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, MintReport::Completed(_))
    }

    pub fn into_result(self) -> Result<Vec<MintOutcome>, PartialFailure> {
        match self {
            MintReport::Completed(outcomes) => Ok(outcomes),
            MintReport::Aborted(failure) => Err(failure),
        }
    }
}

/// Serializable view of a report, for the CLI and API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintSummary<'a> {
    pub completed: bool,
    pub minted: &'a [MintOutcome],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_batch: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> From<&'a MintReport> for MintSummary<'a> {
    fn from(report: &'a MintReport) -> Self {
        match report {
            MintReport::Completed(outcomes) => Self {
                completed: true,
                minted: outcomes,
                failed_batch: None,
                error: None,
            },
            MintReport::Aborted(failure) => Self {
                completed: false,
                minted: &failure.minted,
                failed_batch: Some(failure.failed_batch),
                error: Some(failure.cause.to_string()),
            },
        }
    }
}

/// Mint `items` in batches of `config.batch_size()`, strictly in order.
///
/// No items means no batches: the collaborator is never called and the run
/// completes with an empty outcome list.
pub async fn mint_all<M>(items: &[MintItem], config: &MintConfig, minter: &M) -> MintReport
where
    M: Minter + ?Sized,
{
    let number_of_batches = config.number_of_batches(items.len());
    let mut minted: Vec<MintOutcome> = Vec::with_capacity(items.len());

    for (batch_index, chunk) in items.chunks(config.batch_size()).enumerate() {
        let batch_number = batch_index + 1;
        info!(
            token_id = %config.token_id(),
            "Submitting batch {} of {} ({} items)",
            batch_number,
            number_of_batches,
            chunk.len()
        );

        let result = minter
            .submit(chunk, config.token_id(), config.supply_key())
            .await
            .and_then(|serials| {
                if serials.len() == chunk.len() {
                    Ok(serials)
                } else {
                    Err(MintError::SerialCountMismatch {
                        expected: chunk.len(),
                        actual: serials.len(),
                    })
                }
            });

        match result {
            Ok(serials) => {
                minted.extend(chunk.iter().cloned().zip(serials).map(
                    |(content, serial_number)| MintOutcome {
                        content,
                        serial_number,
                    },
                ));
            }
            Err(cause) => {
                warn!(
                    token_id = %config.token_id(),
                    minted = minted.len(),
                    "Batch {} of {} failed: {}",
                    batch_number,
                    number_of_batches,
                    cause
                );
                return MintReport::Aborted(PartialFailure {
                    minted,
                    failed_batch: batch_number,
                    cause,
                });
            }
        }
    }

    info!(token_id = %config.token_id(), "Minted {} items", minted.len());
    MintReport::Completed(minted)
}
