//! Supervised oracle-mirror task.
//!
//! [`MirrorService::start`] verifies the remote source is reachable
//! (bounded retries, distinct fatal error on exhaustion), then spawns a
//! long-lived task that keeps mirroring prices into the local chain
//! until cancelled. After the first successful sync cycle the task
//! writes the readiness sentinel exactly once and flips the in-process
//! readiness channel; later transient failures are retried with backoff
//! and never crash the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use airlift_chain::client::{ChainClient, PricePayload};
use airlift_core::backoff::{next_delay, RetryPolicy};
use airlift_core::sentinel::Sentinel;

use crate::source::{PriceSource, PriceUpdate};

/// Exponent used by oracle accounts on a local test network.
pub const LOCAL_ORACLE_EXPONENT: i32 = -8;

/// How long `shutdown` waits for the task to exit after cancellation.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a mirror session.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Delay between successful sync cycles.
    pub sync_interval: Duration,
    /// Startup attempts against the source before giving up.
    pub startup_attempts: u32,
    /// Backoff between startup attempts.
    pub startup_backoff: RetryPolicy,
    /// Backoff applied after transient mid-session failures.
    pub retry_backoff: RetryPolicy,
    /// Where to write the readiness sentinel.
    pub sentinel: Sentinel,
    /// Adapt mirrored prices for the local network's account layout.
    pub test_local: bool,
}

impl MirrorConfig {
    /// Defaults for everything except the sentinel location.
    pub fn new(sentinel: Sentinel) -> Self {
        Self {
            sync_interval: Duration::from_secs(2),
            startup_attempts: 5,
            startup_backoff: RetryPolicy::default(),
            retry_backoff: RetryPolicy::default(),
            sentinel,
            test_local: false,
        }
    }
}

/// Fatal mirror startup failures.
///
/// There is deliberately no variant for mid-session errors: once the
/// task is running, failures are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The remote source never answered during startup. Downstream
    /// steps must not wait for a sentinel that will never appear.
    #[error("price source unreachable after {attempts} attempts: {last_error}")]
    SourceUnreachable { attempts: u32, last_error: String },
}

/// Handle to a running mirror session.
///
/// Owning the handle is owning the session: `shutdown` cancels the
/// task and waits for it to exit.
#[derive(Debug)]
pub struct MirrorHandle {
    ready_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MirrorHandle {
    /// A receiver that flips to `true` after the first successful sync.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Whether the first sync has completed.
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Whether the mirror task has exited (it should not, unless
    /// cancelled or aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the task without cleanup. Test hook for simulating a
    /// crashed mirror process.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Cancel the session and wait (bounded) for the task to exit.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down oracle mirror");
        self.cancel.cancel();
        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, self.task).await;
    }
}

/// Factory for mirror sessions.
pub struct MirrorService;

impl MirrorService {
    /// Verify the source is reachable and start the mirror task.
    ///
    /// The first price batch is fetched here, with
    /// [`MirrorConfig::startup_attempts`] bounded retries; exhaustion
    /// surfaces as [`MirrorError::SourceUnreachable`] and nothing is
    /// spawned. Publishing that batch (and the sentinel write) happens
    /// inside the spawned task, since local-chain hiccups are transient
    /// by classification.
    pub async fn start(
        config: MirrorConfig,
        source: Arc<dyn PriceSource>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<MirrorHandle, MirrorError> {
        let first_batch = Self::fetch_first_batch(&config, source.as_ref()).await?;

        let (ready_tx, ready_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            run_mirror(config, source, chain, first_batch, ready_tx, task_cancel).await;
            tracing::info!("Mirror task exited");
        });

        Ok(MirrorHandle {
            ready_rx,
            cancel,
            task,
        })
    }

    async fn fetch_first_batch(
        config: &MirrorConfig,
        source: &dyn PriceSource,
    ) -> Result<Vec<PriceUpdate>, MirrorError> {
        let mut delay = config.startup_backoff.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=config.startup_attempts {
            match source.fetch_prices().await {
                Ok(batch) => {
                    tracing::info!(feeds = batch.len(), attempt, "Connected to price source");
                    return Ok(batch);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Price source fetch failed during startup");
                    last_error = e.to_string();
                    if attempt < config.startup_attempts {
                        tokio::time::sleep(delay).await;
                        delay = next_delay(delay, &config.startup_backoff);
                    }
                }
            }
        }

        Err(MirrorError::SourceUnreachable {
            attempts: config.startup_attempts,
            last_error,
        })
    }
}

/// Adapt a source price to the local network's oracle account layout:
/// rescale to [`LOCAL_ORACLE_EXPONENT`].
pub fn normalize_for_local(update: &PriceUpdate) -> PricePayload {
    let shift = update.exponent - LOCAL_ORACLE_EXPONENT;
    let (price, confidence) = if shift >= 0 {
        let factor = 10i64.saturating_pow(shift as u32);
        (
            update.price.saturating_mul(factor),
            update.confidence.saturating_mul(factor as u64),
        )
    } else {
        let factor = 10i64.saturating_pow((-shift) as u32);
        (update.price / factor, update.confidence / factor as u64)
    };

    PricePayload {
        feed: update.feed.clone(),
        price,
        confidence,
        exponent: LOCAL_ORACLE_EXPONENT,
    }
}

fn to_payload(update: &PriceUpdate, test_local: bool) -> PricePayload {
    if test_local {
        normalize_for_local(update)
    } else {
        PricePayload {
            feed: update.feed.clone(),
            price: update.price,
            confidence: update.confidence,
            exponent: update.exponent,
        }
    }
}

/// Publish one batch into the local chain. Fails on the first error;
/// the caller retries the whole batch.
async fn publish_batch(
    chain: &dyn ChainClient,
    batch: &[PriceUpdate],
    test_local: bool,
) -> Result<(), airlift_core::error::ChainError> {
    for update in batch {
        chain.publish_price(&to_payload(update, test_local)).await?;
    }
    Ok(())
}

/// The mirror session body: first sync, sentinel, then steady state.
async fn run_mirror(
    config: MirrorConfig,
    source: Arc<dyn PriceSource>,
    chain: Arc<dyn ChainClient>,
    first_batch: Vec<PriceUpdate>,
    ready_tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    // First sync cycle. Retry until it lands or we are cancelled; the
    // sentinel must mean "prices are actually on the local chain".
    let mut delay = config.retry_backoff.initial_delay;
    loop {
        match publish_batch(chain.as_ref(), &first_batch, config.test_local).await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(error = %e, "First sync publish failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = next_delay(delay, &config.retry_backoff);
            }
        }
    }

    match config.sentinel.create() {
        Ok(true) => {
            tracing::info!(path = %config.sentinel.path().display(), "Readiness sentinel written");
        }
        Ok(false) => {
            tracing::warn!(
                path = %config.sentinel.path().display(),
                "Readiness sentinel already existed",
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to write readiness sentinel");
        }
    }
    let _ = ready_tx.send(true);

    // Steady state: fetch and publish on an interval; back off after
    // transient failures instead of crashing.
    let mut wait = config.sync_interval;
    let mut retry_delay = config.retry_backoff.initial_delay;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        match source.fetch_prices().await {
            Ok(batch) => {
                if let Err(e) = publish_batch(chain.as_ref(), &batch, config.test_local).await {
                    tracing::warn!(error = %e, "Price publish failed, backing off");
                    wait = retry_delay;
                    retry_delay = next_delay(retry_delay, &config.retry_backoff);
                } else {
                    wait = config.sync_interval;
                    retry_delay = config.retry_backoff.initial_delay;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Price source fetch failed, backing off");
                wait = retry_delay;
                retry_delay = next_delay(retry_delay, &config.retry_backoff);
            }
        }
    }
}
