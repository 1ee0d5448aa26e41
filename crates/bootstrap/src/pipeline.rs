//! The bootstrap pipeline driver.
//!
//! Runs the stages strictly in order and fails fast: provision the
//! authority, apply the configuration set, write the derived app
//! config, create and update the lookup registry, start the oracle
//! mirror, wait for readiness, then trigger the build. The mirror
//! keeps running after a successful run; the returned report carries
//! its handle so the caller decides when to shut it down.

use std::path::PathBuf;
use std::sync::Arc;

use airlift_chain::client::ChainClient;
use airlift_core::keypair::Pubkey;
use airlift_core::network::NetworkKind;
use airlift_oracle::mirror::{MirrorConfig, MirrorError, MirrorService};
use airlift_oracle::source::PriceSource;

use crate::build_trigger::{self, BuildCommand, BuildError};
use crate::config::{AppConfig, ConfigError, ConfigSet};
use crate::gate::{self, GateConfig, GateError};
use crate::stages::apply::{apply_config, ApplyError, ApplySummary};
use crate::stages::provision::{provision, ProvisionError, DEFAULT_AIRDROP_LAMPORTS};
use crate::stages::registry::{self, RegistryStageError};

/// Everything one bootstrap run needs to know.
#[derive(Debug, Clone)]
pub struct BootstrapContext {
    pub network: NetworkKind,
    /// Where the generated authority credential is persisted.
    pub authority_path: PathBuf,
    /// Directory holding the declarative configuration set.
    pub config_dir: PathBuf,
    /// Where to write the derived application config, if anywhere.
    pub app_config_path: Option<PathBuf>,
    /// The airspace whose lookup tables the registry tracks.
    pub airspace: String,
    pub airdrop_lamports: u64,
    pub mirror: MirrorConfig,
    pub gate: GateConfig,
    /// Build to trigger once the environment is ready, if any.
    pub build: Option<BuildCommand>,
}

impl BootstrapContext {
    /// A localnet context with default funding, gate, and no build.
    pub fn localnet(config_dir: impl Into<PathBuf>, mirror: MirrorConfig) -> Self {
        Self {
            network: NetworkKind::Localnet,
            authority_path: PathBuf::from("authority.json"),
            config_dir: config_dir.into(),
            app_config_path: None,
            airspace: "default".to_string(),
            airdrop_lamports: DEFAULT_AIRDROP_LAMPORTS,
            mirror,
            gate: GateConfig::default(),
            build: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("configuration set invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("configuration apply failed: {0}")]
    Apply(#[from] ApplyError),

    #[error("registry stage failed: {0}")]
    Registry(#[from] RegistryStageError),

    #[error("failed to remove stale sentinel: {0}")]
    Sentinel(#[source] std::io::Error),

    #[error("oracle mirror failed to start: {0}")]
    Mirror(#[from] MirrorError),

    #[error("readiness gate failed: {0}")]
    Gate(#[from] GateError),

    #[error("build trigger failed: {0}")]
    Build(#[from] BuildError),
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub authority: Pubkey,
    pub apply: ApplySummary,
    /// The still-running mirror session.
    pub mirror: airlift_oracle::mirror::MirrorHandle,
}

pub struct Pipeline;

impl Pipeline {
    /// Run every stage in order. On failure after the mirror has been
    /// started, the mirror is shut down before the error propagates so
    /// no orphaned session outlives the failed run.
    pub async fn run(
        ctx: BootstrapContext,
        chain: Arc<dyn ChainClient>,
        source: Arc<dyn PriceSource>,
    ) -> Result<PipelineReport, PipelineError> {
        tracing::info!(network = %ctx.network, airspace = %ctx.airspace, "Starting bootstrap run");

        let keypair = provision(
            chain.as_ref(),
            ctx.network,
            &ctx.authority_path,
            ctx.airdrop_lamports,
        )
        .await?;
        let authority = keypair.pubkey();

        let set = ConfigSet::load(&ctx.config_dir)?;
        let apply = apply_config(chain.as_ref(), &authority, &set).await?;

        if let Some(path) = &ctx.app_config_path {
            AppConfig::from_config_set(&set, &authority).write_to_file(path)?;
            tracing::info!(path = %path.display(), "Application config written");
        }

        registry::create(chain.as_ref(), &authority).await?;
        registry::update_for_airspace(chain.as_ref(), &authority, &set, &ctx.airspace).await?;

        // A sentinel surviving from a previous run would open the gate
        // before this run's mirror has synced anything.
        ctx.mirror
            .sentinel
            .remove_stale()
            .map_err(PipelineError::Sentinel)?;

        let gate_budget = ctx.gate.max_wait();
        let mirror = MirrorService::start(ctx.mirror, source, chain).await?;

        if let Err(e) = gate::wait_for_mirror(&mirror, gate_budget).await {
            mirror.shutdown().await;
            return Err(e.into());
        }

        if let Some(build) = &ctx.build {
            if let Err(e) = build_trigger::run(build).await {
                mirror.shutdown().await;
                return Err(e.into());
            }
        }

        tracing::info!(authority = %authority, "Bootstrap run complete");

        Ok(PipelineReport {
            authority,
            apply,
            mirror,
        })
    }
}
