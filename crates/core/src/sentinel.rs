//! Readiness sentinel file.
//!
//! The sentinel is the single source of truth that the oracle mirror
//! has completed its first successful sync cycle. Its mere existence is
//! the full protocol; the file carries no content schema. The mirror is
//! the sole writer, the readiness gate the reader.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Conventional sentinel file name, created in the working directory
/// unless an explicit path is configured.
pub const DEFAULT_SENTINEL_FILE: &str = ".localnet-ready";

/// Handle to the readiness sentinel at a well-known path.
#[derive(Debug, Clone)]
pub struct Sentinel {
    path: PathBuf,
}

impl Sentinel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sentinel at the conventional path under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_SENTINEL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the sentinel currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the sentinel. Returns `true` if this call created it,
    /// `false` if it already existed (creation is atomic, so two
    /// writers cannot both observe `true`).
    pub fn create(&self) -> io::Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a sentinel left behind by a previous run, if any.
    ///
    /// A stale sentinel from a prior session would let the gate report
    /// ready before the mirror has synced anything; the pipeline driver
    /// calls this before starting the mirror.
    pub fn remove_stale(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
