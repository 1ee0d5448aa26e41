//! Authority credentials for a bootstrap run.
//!
//! A [`Keypair`] identifies the entity allowed to mutate registry state
//! and sign configuration transactions on a test network. It is created
//! once per run, persisted to a local file for reuse by subsequent
//! commands in the same run, and never outlives the environment.
//!
//! The public key is derived deterministically from the 32-byte seed
//! with SHA-256. Test-environment identity only; real signature schemes
//! are out of scope here.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a keypair seed in bytes.
pub const SEED_LENGTH: usize = 32;

/// A public key, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pubkey(String);

impl Pubkey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a deterministic address from a list of seed strings.
///
/// Used to compute config-entry and lookup-table addresses without a
/// network round trip: the same seeds always map to the same address.
pub fn derive_address(seeds: &[&str]) -> Pubkey {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed.as_bytes());
        hasher.update([0u8]); // separator so ["ab","c"] != ["a","bc"]
    }
    Pubkey(format!("{:x}", hasher.finalize()))
}

/// An authority signing credential.
pub struct Keypair {
    seed: [u8; SEED_LENGTH],
}

/// Errors from credential generation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum KeypairError {
    #[error("failed while trying I/O on {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("malformed keypair file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl Keypair {
    /// Generate a fresh keypair from the thread RNG. No passphrase.
    pub fn generate() -> Self {
        let mut seed = [0u8; SEED_LENGTH];
        rand::rng().fill_bytes(&mut seed);
        Self { seed }
    }

    /// Build a keypair from a known seed. Used by tests for
    /// deterministic authorities.
    pub fn from_seed(seed: [u8; SEED_LENGTH]) -> Self {
        Self { seed }
    }

    /// The public key derived from the seed.
    pub fn pubkey(&self) -> Pubkey {
        let hash = Sha256::digest(self.seed);
        Pubkey(format!("{hash:x}"))
    }

    /// Write the keypair to `path` as a JSON byte array, forcibly
    /// overwriting any existing file.
    ///
    /// On unix the file mode is set to `0o600` (owner read/write only).
    pub fn write_to_file(&self, path: &Path) -> Result<(), KeypairError> {
        let json = serde_json::to_string(&self.seed.to_vec())
            .expect("byte vec serialization cannot fail");

        fs::write(path, json).map_err(|error| KeypairError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).map_err(|error| KeypairError::Io {
                path: path.to_path_buf(),
                error,
            })?;
        }

        Ok(())
    }

    /// Read a keypair previously written with
    /// [`write_to_file`](Self::write_to_file).
    pub fn read_from_file(path: &Path) -> Result<Self, KeypairError> {
        let json = fs::read_to_string(path).map_err(|error| KeypairError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        let bytes: Vec<u8> =
            serde_json::from_str(&json).map_err(|e| KeypairError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let seed: [u8; SEED_LENGTH] =
            bytes
                .try_into()
                .map_err(|v: Vec<u8>| KeypairError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("expected {SEED_LENGTH} bytes, found {}", v.len()),
                })?;

        Ok(Self { seed })
    }
}

impl fmt::Debug for Keypair {
    /// The seed is deliberately not printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}
