//! Mint collaborators.
//!
//! A [`Minter`] submits one batch and answers with one serial number per item,
//! in item order, or fails the whole batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ConfigError, MintError, MintResult};
use crate::models::{MintItem, SerialNumber, SupplyKey, TokenId};

/// The external "mint these items" primitive.
#[async_trait]
pub trait Minter: Send + Sync {
    /// Mint `items` under `token_id`, signed with `supply_key`.
    async fn submit(
        &self,
        items: &[MintItem],
        token_id: &TokenId,
        supply_key: &SupplyKey,
    ) -> MintResult<Vec<SerialNumber>>;
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintRequestBody<'a> {
    token_id: &'a str,
    metadata: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MintResponseBody {
    serials: Vec<SerialNumber>,
}

/// Mints through a mint service over HTTP.
///
/// `POST {endpoint}/tokens/{token_id}/mint` with
/// `{"tokenId": "...", "metadata": ["...", ...]}` and the supply key as a
/// bearer token. The service answers `{"serials": [1, 2, ...]}`.
#[derive(Debug, Clone)]
pub struct HttpMinter {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpMinter {
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = reqwest::Url::parse(endpoint.trim_end_matches('/'))
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        Ok(Self { client, endpoint })
    }

    /// The token id becomes a single percent-encoded path segment.
    fn mint_url(&self, token_id: &TokenId) -> MintResult<reqwest::Url> {
        let segment = token_id.as_str();
        if matches!(segment, "." | "..") {
            return Err(MintError::Collaborator(format!(
                "Token id {:?} cannot be used in a URL path",
                segment
            )));
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                MintError::Collaborator(format!("Endpoint {} cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["tokens", segment, "mint"]);
        Ok(url)
    }
}

#[async_trait]
impl Minter for HttpMinter {
    async fn submit(
        &self,
        items: &[MintItem],
        token_id: &TokenId,
        supply_key: &SupplyKey,
    ) -> MintResult<Vec<SerialNumber>> {
        let body = MintRequestBody {
            token_id: token_id.as_str(),
            metadata: items
                .iter()
                .map(MintItem::content)
                .collect::<Result<_, _>>()?,
        };

        let response = self
            .client
            .post(self.mint_url(token_id)?)
            .bearer_auth(supply_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MintError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MintResponseBody = response.json().await?;
        Ok(parsed.serials)
    }
}

// =============================================================================
// Dry run
// =============================================================================

/// Assigns consecutive serial numbers without talking to any ledger.
#[derive(Debug)]
pub struct DryRunMinter {
    next_serial: AtomicU64,
}

impl DryRunMinter {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_serial: SerialNumber) -> Self {
        Self {
            next_serial: AtomicU64::new(first_serial),
        }
    }
}

impl Default for DryRunMinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Minter for DryRunMinter {
    async fn submit(
        &self,
        items: &[MintItem],
        token_id: &TokenId,
        _supply_key: &SupplyKey,
    ) -> MintResult<Vec<SerialNumber>> {
        let first = self
            .next_serial
            .fetch_add(items.len() as u64, Ordering::SeqCst);
        tracing::debug!(%token_id, first, count = items.len(), "dry run batch");
        Ok((first..first + items.len() as u64).collect())
    }
}
