//! Authority provisioning: generate a credential and fund it.

use std::path::Path;

use airlift_chain::client::ChainClient;
use airlift_core::error::ChainError;
use airlift_core::keypair::{Keypair, KeypairError};
use airlift_core::network::NetworkKind;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Default funding for a fresh bootstrap authority.
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = 1_000 * LAMPORTS_PER_SOL;

/// Credential generation and funding failures. All fatal; the caller
/// re-runs the whole pipeline rather than retrying a stage.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Keypair(#[from] KeypairError),

    #[error("network {0} has no faucet; cannot provision an authority against it")]
    NoFaucet(NetworkKind),

    #[error("airdrop request failed: {0}")]
    Airdrop(#[source] ChainError),
}

/// Generate a fresh authority keypair, persist it to `keypair_path`
/// (overwriting any previous credential), and fund it with a single
/// faucet request. No retries.
pub async fn provision(
    chain: &dyn ChainClient,
    network: NetworkKind,
    keypair_path: &Path,
    lamports: u64,
) -> Result<Keypair, ProvisionError> {
    if !network.has_faucet() {
        return Err(ProvisionError::NoFaucet(network));
    }

    let keypair = Keypair::generate();
    keypair.write_to_file(keypair_path)?;

    chain
        .request_airdrop(&keypair.pubkey(), lamports)
        .await
        .map_err(ProvisionError::Airdrop)?;

    tracing::info!(
        authority = %keypair.pubkey(),
        lamports,
        path = %keypair_path.display(),
        "Authority provisioned and funded",
    );

    Ok(keypair)
}
