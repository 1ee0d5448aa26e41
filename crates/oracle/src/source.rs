//! Remote price-feed source.
//!
//! The mirror reads current prices from a source network (mainnet by
//! default) through the [`PriceSource`] trait. The production
//! implementation is [`HttpPriceSource`]; tests script their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default remote source endpoint: the public mainnet RPC.
pub const DEFAULT_SOURCE_URL: &str = "https://api.mainnet-beta.solana.com";

/// A single price observation from the source network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Feed identifier (token symbol).
    pub feed: String,
    /// Price in `10^exponent` units.
    pub price: i64,
    /// Confidence interval around the price.
    pub confidence: u64,
    /// Decimal exponent of the price.
    pub exponent: i32,
}

/// Errors from the remote price source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request never reached the source endpoint.
    #[error("source transport error: {0}")]
    Transport(String),

    /// The source answered with an RPC error.
    #[error("source rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The source answered with an unexpected payload.
    #[error("malformed source response: {0}")]
    Malformed(String),
}

/// Where the mirror gets its prices from.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current batch of price feeds.
    async fn fetch_prices(&self) -> Result<Vec<PriceUpdate>, SourceError>;
}

/// JSON-RPC price source over HTTP.
pub struct HttpPriceSource {
    client: reqwest::Client,
    source_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Vec<PriceUpdate>>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl HttpPriceSource {
    /// Create a source client for `source_url`,
    /// e.g. [`DEFAULT_SOURCE_URL`].
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            source_url: source_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_prices(&self) -> Result<Vec<PriceUpdate>, SourceError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getPriceFeeds",
            "params": [],
        });

        let response = self
            .client
            .post(&self.source_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(SourceError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| SourceError::Malformed("getPriceFeeds: missing result".into()))
    }
}
