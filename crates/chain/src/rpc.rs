//! JSON-RPC implementation of [`ChainClient`] over HTTP.
//!
//! Talks to the validator's RPC endpoint using [`reqwest`]. Every
//! method is one `call`; request ids are a process-local counter.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use airlift_core::error::ChainError;
use airlift_core::keypair::Pubkey;

use crate::client::{ApplyOutcome, ChainClient, ConfigEntry, PricePayload};

/// JSON-RPC client for a single validator endpoint.
pub struct RpcChain {
    client: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

/// Envelope for a JSON-RPC response.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcChain {
    /// Create a client for the given RPC endpoint,
    /// e.g. `http://127.0.0.1:8899`.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Send one JSON-RPC request and unwrap the `result` field.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Malformed(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| ChainError::Malformed(format!("{method}: missing result field")))
    }
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<(), ChainError> {
        self.call(
            "requestAirdrop",
            serde_json::json!([recipient.as_str(), lamports]),
        )
        .await?;
        tracing::info!(recipient = %recipient, lamports, "Airdrop requested");
        Ok(())
    }

    async fn apply_entry(
        &self,
        authority: &Pubkey,
        entry: &ConfigEntry,
    ) -> Result<ApplyOutcome, ChainError> {
        let result = self
            .call(
                "applyConfigEntry",
                serde_json::json!([authority.as_str(), entry.key, entry.value]),
            )
            .await?;

        // The node reports whether a transaction was actually sent.
        let changed = result
            .get("changed")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ChainError::Malformed("applyConfigEntry: missing changed".into()))?;

        Ok(if changed {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Unchanged
        })
    }

    async fn registry_exists(&self, authority: &Pubkey) -> Result<bool, ChainError> {
        let result = self
            .call("getLookupRegistry", serde_json::json!([authority.as_str()]))
            .await?;
        Ok(!result.is_null())
    }

    async fn create_registry(&self, authority: &Pubkey) -> Result<(), ChainError> {
        self.call(
            "createLookupRegistry",
            serde_json::json!([authority.as_str()]),
        )
        .await?;
        tracing::info!(authority = %authority, "Lookup registry created");
        Ok(())
    }

    async fn registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
    ) -> Result<Option<BTreeSet<String>>, ChainError> {
        let result = self
            .call(
                "getLookupTables",
                serde_json::json!([authority.as_str(), airspace]),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let tables = result
            .as_array()
            .ok_or_else(|| ChainError::Malformed("getLookupTables: expected array".into()))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or_else(|| ChainError::Malformed("getLookupTables: non-string table".into()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Some(tables))
    }

    async fn replace_registry_tables(
        &self,
        authority: &Pubkey,
        airspace: &str,
        tables: BTreeSet<String>,
    ) -> Result<(), ChainError> {
        let tables: Vec<&str> = tables.iter().map(String::as_str).collect();
        self.call(
            "setLookupTables",
            serde_json::json!([authority.as_str(), airspace, tables]),
        )
        .await?;
        Ok(())
    }

    async fn publish_price(&self, price: &PricePayload) -> Result<(), ChainError> {
        self.call("setOraclePrice", serde_json::json!([price])).await?;
        Ok(())
    }
}
