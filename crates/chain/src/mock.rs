//! In-memory [`ChainClient`] for tests.
//!
//! Tracks balances, applied config entries, registries, and published
//! prices behind a mutex, with toggles for injecting failures.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use airlift_core::error::ChainError;
use airlift_core::keypair::Pubkey;

use crate::client::{ApplyOutcome, ChainClient, ConfigEntry, PricePayload};

#[derive(Default)]
struct State {
    balances: HashMap<String, u64>,
    entries: HashMap<String, serde_json::Value>,
    /// authority -> airspace -> table set
    registries: HashMap<String, HashMap<String, BTreeSet<String>>>,
    prices: HashMap<String, PricePayload>,
    publish_count: u64,
    fail_airdrop: bool,
    fail_publish: bool,
}

/// An in-memory chain. Cheap to share; all methods lock internally.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every airdrop fail, simulating a drained faucet.
    pub fn fail_airdrops(&self) {
        self.state.lock().unwrap().fail_airdrop = true;
    }

    /// Make every price publish fail, simulating a broken local oracle
    /// account layout.
    pub fn fail_publishes(&self) {
        self.state.lock().unwrap().fail_publish = true;
    }

    pub fn balance(&self, key: &Pubkey) -> u64 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(key.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Number of successful `publish_price` calls so far.
    pub fn publish_count(&self) -> u64 {
        self.state.lock().unwrap().publish_count
    }

    pub fn price_for(&self, feed: &str) -> Option<PricePayload> {
        self.state.lock().unwrap().prices.get(feed).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_airdrop {
            return Err(ChainError::Rpc {
                code: -32005,
                message: "faucet has insufficient funds".into(),
            });
        }
        *state.balances.entry(recipient.as_str().to_string()).or_insert(0) += lamports;
        Ok(())
    }

    async fn apply_entry(
        &self,
        _authority: &Pubkey,
        entry: &ConfigEntry,
    ) -> Result<ApplyOutcome, ChainError> {
        let mut state = self.state.lock().unwrap();
        match state.entries.get(&entry.key) {
            Some(existing) if *existing == entry.value => Ok(ApplyOutcome::Unchanged),
            _ => {
                state.entries.insert(entry.key.clone(), entry.value.clone());
                Ok(ApplyOutcome::Applied)
            }
        }
    }

    async fn registry_exists(&self, authority: &Pubkey) -> Result<bool, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .registries
            .contains_key(authority.as_str()))
    }

    async fn create_registry(&self, authority: &Pubkey) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.registries.contains_key(authority.as_str()) {
            // Mirrors the node's behavior on duplicate initialization.
            return Err(ChainError::Rpc {
                code: -32009,
                message: "registry account already initialized".into(),
            });
        }
        state
            .registries
            .insert(authority.as_str().to_string(), HashMap::new());
        Ok(())
    }

    async fn registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
    ) -> Result<Option<BTreeSet<String>>, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .registries
            .get(authority.as_str())
            .and_then(|airspaces| airspaces.get(airspace))
            .cloned())
    }

    async fn replace_registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
        tables: BTreeSet<String>,
    ) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        let airspaces = state
            .registries
            .get_mut(authority.as_str())
            .ok_or_else(|| ChainError::Rpc {
                code: -32010,
                message: "registry account not found".into(),
            })?;
        airspaces.insert(airspace.to_string(), tables);
        Ok(())
    }

    async fn publish_price(&self, price: &PricePayload) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_publish {
            return Err(ChainError::Rpc {
                code: -32011,
                message: "oracle account rejected write".into(),
            });
        }
        state.prices.insert(price.feed.clone(), price.clone());
        state.publish_count += 1;
        Ok(())
    }
}
