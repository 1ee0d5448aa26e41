//! Lookup-table registry operations.
//!
//! The registry is a named, versioned set of address-lookup tables
//! keyed by airspace. `create` initializes it for an authority and is
//! deliberately not idempotent: a second create for the same authority
//! fails with [`RegistryError::AlreadyExists`], every time. `update`
//! replaces the table set for an airspace and is safe to repeat.

use std::collections::BTreeSet;

use airlift_core::error::ChainError;
use airlift_core::keypair::Pubkey;

use crate::client::ChainClient;

/// Airspace name used when none is configured.
pub const DEFAULT_AIRSPACE: &str = "default";

/// Registry precondition and transport failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A registry already exists for this authority.
    #[error("registry already exists for authority {0}")]
    AlreadyExists(Pubkey),

    /// `update` was called before `create`.
    #[error("no registry exists for authority {0}; run create-registry first")]
    NotFound(Pubkey),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Initialize the lookup-table registry for `authority`.
pub async fn create_registry(
    chain: &dyn ChainClient,
    authority: &Pubkey,
) -> Result<(), RegistryError> {
    if chain.registry_exists(authority).await? {
        return Err(RegistryError::AlreadyExists(authority.clone()));
    }

    chain.create_registry(authority).await?;
    Ok(())
}

/// Replace the registry's table set for `airspace` with `tables`.
///
/// Reflects the latest resolved lookup-table set: entries absent from
/// `tables` are removed, not kept. Requires a prior `create`.
pub async fn update_registry(
    chain: &dyn ChainClient,
    authority: &Pubkey,
    airspace: &str,
    tables: BTreeSet<String>,
) -> Result<(), RegistryError> {
    if !chain.registry_exists(authority).await? {
        return Err(RegistryError::NotFound(authority.clone()));
    }

    tracing::info!(
        authority = %authority,
        airspace,
        table_count = tables.len(),
        "Updating lookup registry",
    );

    chain
        .replace_registry_tables(authority, airspace, tables)
        .await?;
    Ok(())
}
