//! The [`ChainClient`] trait and its wire types.
//!
//! One method per on-chain effect the pipeline needs. Implementations
//! are expected to be cheap to share behind an `Arc`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use airlift_core::error::ChainError;
use airlift_core::keypair::Pubkey;

/// A single desired-state document entry.
///
/// `key` addresses the entry on chain (stable across runs); `value` is
/// the full desired state. Applying the same key/value pair twice is a
/// no-op by contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: serde_json::Value,
}

/// What happened when an entry was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The entry was new or had drifted; a transaction was sent.
    Applied,
    /// On-chain state already matched; nothing was sent.
    Unchanged,
}

/// A price written into a local oracle account by the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePayload {
    /// Feed identifier (token symbol in the local layout).
    pub feed: String,
    /// Price in `10^exponent` units.
    pub price: i64,
    /// Confidence interval around the price.
    pub confidence: u64,
    /// Decimal exponent of the price.
    pub exponent: i32,
}

/// Operations the bootstrap pipeline performs against a network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Request funds from the network faucet for `recipient`.
    ///
    /// A single request; callers do not retry (a failed bootstrap run
    /// is re-run from the top).
    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<(), ChainError>;

    /// Apply one configuration entry, signed by `authority`.
    ///
    /// Must report [`ApplyOutcome::Unchanged`] rather than erroring
    /// when the entry already exists with identical state.
    async fn apply_entry(
        &self,
        authority: &Pubkey,
        entry: &ConfigEntry,
    ) -> Result<ApplyOutcome, ChainError>;

    /// Whether a lookup-table registry exists for `authority`.
    async fn registry_exists(&self, authority: &Pubkey) -> Result<bool, ChainError>;

    /// Initialize the lookup-table registry for `authority`.
    ///
    /// Precondition: no registry exists for the authority. The node
    /// rejects a duplicate initialization.
    async fn create_registry(&self, authority: &Pubkey) -> Result<(), ChainError>;

    /// The registry's current table set for a named airspace, or `None`
    /// if the airspace has no entry yet.
    async fn registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
    ) -> Result<Option<BTreeSet<String>>, ChainError>;

    /// Replace the registry's table set for `airspace` with `tables`.
    ///
    /// Replace, not append: stale entries disappear.
    async fn replace_registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
        tables: BTreeSet<String>,
    ) -> Result<(), ChainError>;

    /// Write a mirrored price into the local oracle account for its feed.
    async fn publish_price(&self, price: &PricePayload) -> Result<(), ChainError>;
}
