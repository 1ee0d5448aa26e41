//! Registry stage: create the lookup-table registry and refresh its
//! table set for an airspace from the configuration set.

use airlift_chain::client::ChainClient;
use airlift_chain::registry::{self, RegistryError};
use airlift_core::keypair::Pubkey;

use crate::config::ConfigSet;

#[derive(Debug, thiserror::Error)]
pub enum RegistryStageError {
    #[error("airspace '{0}' not present in the configuration set")]
    UnknownAirspace(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Initialize the registry for `authority`. Fails if one exists.
pub async fn create(
    chain: &dyn ChainClient,
    authority: &Pubkey,
) -> Result<(), RegistryStageError> {
    registry::create_registry(chain, authority).await?;
    Ok(())
}

/// Resolve the airspace's lookup-table set from the configuration set
/// and replace the registry's entry for it. Safe to repeat.
pub async fn update_for_airspace(
    chain: &dyn ChainClient,
    authority: &Pubkey,
    set: &ConfigSet,
    airspace: &str,
) -> Result<(), RegistryStageError> {
    let tables = set
        .lookup_addresses(airspace)
        .ok_or_else(|| RegistryStageError::UnknownAirspace(airspace.to_string()))?;

    registry::update_registry(chain, authority, airspace, tables).await?;
    Ok(())
}
