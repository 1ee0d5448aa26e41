//! Target network descriptor.
//!
//! Every command in the pipeline takes a [`NetworkKind`] so that the
//! same binary can drive a localnet bootstrap, a devnet deployment, or
//! read-only queries against mainnet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The network a client may connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// The public mainnet network.
    Mainnet,
    /// The public network for development testing.
    Devnet,
    /// A non-public network for local testing.
    Localnet,
}

impl NetworkKind {
    /// Default JSON-RPC endpoint for the network.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Whether the network has a faucet that can fund fresh authorities.
    ///
    /// Mainnet has no faucet; provisioning against it is a hard error
    /// before any request is sent.
    pub fn has_faucet(&self) -> bool {
        !matches!(self, Self::Mainnet)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Devnet => "devnet",
            Self::Localnet => "localnet",
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "m" => Ok(Self::Mainnet),
            "devnet" | "d" => Ok(Self::Devnet),
            "localnet" | "l" => Ok(Self::Localnet),
            other => Err(format!(
                "Invalid network '{other}'. Must be one of: mainnet, devnet, localnet"
            )),
        }
    }
}
