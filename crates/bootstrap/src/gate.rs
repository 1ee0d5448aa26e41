//! Readiness gates.
//!
//! Two equivalent ways to wait for the mirror's first sync, both with
//! a hard upper bound so the pipeline can never hang forever:
//!
//! - [`wait_for_mirror`] awaits the in-process readiness channel of a
//!   [`MirrorHandle`] the driver owns. This is the primary gate; it can
//!   also tell a dead mirror apart from a slow one.
//! - [`wait_for_sentinel`] polls the sentinel file. Used when the
//!   mirror runs as a separate detached process and no handle exists.

use std::time::Duration;

use airlift_core::sentinel::Sentinel;
use airlift_oracle::mirror::MirrorHandle;

/// Polling parameters for the filesystem gate, and the wall-clock
/// budget (`poll_interval * max_attempts`) for the in-process gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl GateConfig {
    /// Total wall-clock budget before the gate times out.
    pub fn max_wait(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

/// Why the gate did not open.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The mirror is (presumably) still starting, but the budget ran
    /// out. Distinct from a crash so operators can tell slow from
    /// broken.
    #[error("readiness gate timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// The mirror task exited before ever becoming ready.
    #[error("oracle mirror exited before becoming ready")]
    MirrorExited,
}

/// Wait for the mirror's readiness channel, bounded by `budget`.
pub async fn wait_for_mirror(handle: &MirrorHandle, budget: Duration) -> Result<(), GateError> {
    let mut rx = handle.ready();

    let outcome = tokio::time::timeout(budget, async {
        loop {
            if *rx.borrow_and_update() {
                return Ok(());
            }
            // The sender is dropped when the mirror task exits.
            if rx.changed().await.is_err() {
                return Err(GateError::MirrorExited);
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) if handle.is_finished() => Err(GateError::MirrorExited),
        Err(_elapsed) => Err(GateError::Timeout { waited: budget }),
    }
}

/// Poll for the sentinel's existence, checking once per interval up to
/// `max_attempts` times. Reports ready within one interval of the
/// sentinel's creation and never before it exists.
pub async fn wait_for_sentinel(sentinel: &Sentinel, config: &GateConfig) -> Result<(), GateError> {
    for attempt in 0..config.max_attempts {
        if sentinel.exists() {
            tracing::info!(attempt, path = %sentinel.path().display(), "Readiness sentinel found");
            return Ok(());
        }
        tokio::time::sleep(config.poll_interval).await;
    }

    Err(GateError::Timeout {
        waited: config.max_wait(),
    })
}
