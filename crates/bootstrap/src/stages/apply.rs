//! Idempotent application of a declarative configuration set.

use std::path::PathBuf;

use airlift_chain::client::{ApplyOutcome, ChainClient};
use airlift_core::error::ChainError;
use airlift_core::keypair::Pubkey;

use crate::config::{entries_for, ConfigSet};

/// What an apply pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplySummary {
    /// Entries that were new or had drifted.
    pub applied: usize,
    /// Entries already matching on-chain state.
    pub unchanged: usize,
}

/// Configuration application failures, with the offending document.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("failed applying {document}: {source}")]
    Entry {
        document: PathBuf,
        source: ChainError,
    },
}

/// Apply every entry of the set, in document order, signing with
/// `authority`. Re-applying an already-applied set converges with all
/// entries unchanged and no error; new entries still apply.
pub async fn apply_config(
    chain: &dyn ChainClient,
    authority: &Pubkey,
    set: &ConfigSet,
) -> Result<ApplySummary, ApplyError> {
    let mut summary = ApplySummary::default();

    for (path, doc) in set.documents() {
        for entry in entries_for(doc) {
            let outcome = chain
                .apply_entry(authority, &entry)
                .await
                .map_err(|source| ApplyError::Entry {
                    document: path.clone(),
                    source,
                })?;

            match outcome {
                ApplyOutcome::Applied => summary.applied += 1,
                ApplyOutcome::Unchanged => summary.unchanged += 1,
            }
        }
    }

    tracing::info!(
        applied = summary.applied,
        unchanged = summary.unchanged,
        "Configuration set applied",
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;

    use airlift_chain::mock::MockChain;
    use airlift_core::keypair::Keypair;

    fn write_doc(dir: &Path, file: &str, contents: &str) {
        fs::write(dir.join(file), contents).unwrap();
    }

    const DOC: &str = r#"
name = "default"

[[tokens]]
symbol = "USDC"
name = "USD Coin"
decimals = 6
"#;

    #[tokio::test]
    async fn second_apply_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DOC);
        let set = ConfigSet::load(dir.path()).unwrap();

        let chain = MockChain::new();
        let authority = Keypair::from_seed([5u8; 32]).pubkey();

        let first = apply_config(&chain, &authority, &set).await.unwrap();
        assert_eq!(first.applied, 2); // airspace + token
        assert_eq!(first.unchanged, 0);

        let entries_after_first = chain.entry_count();

        let second = apply_config(&chain, &authority, &set).await.unwrap();
        assert_eq!(second.applied, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(chain.entry_count(), entries_after_first);
    }

    #[tokio::test]
    async fn new_entries_still_apply_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DOC);
        let chain = MockChain::new();
        let authority = Keypair::from_seed([5u8; 32]).pubkey();

        let set = ConfigSet::load(dir.path()).unwrap();
        apply_config(&chain, &authority, &set).await.unwrap();

        // A second airspace arrives in the set.
        write_doc(dir.path(), "extra.toml", "name = \"extra\"\n");
        let set = ConfigSet::load(dir.path()).unwrap();

        let summary = apply_config(&chain, &authority, &set).await.unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.unchanged, 2);
    }
}
