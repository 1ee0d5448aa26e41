//! `airlift` -- localnet bootstrap and readiness orchestration CLI.
//!
//! `airlift run` drives the full pipeline against a fresh local
//! validator; the other subcommands expose individual stages for
//! re-running them in isolation.
//!
//! # Environment variables
//!
//! | Variable     | Required | Default          | Description                     |
//! |--------------|----------|------------------|---------------------------------|
//! | `RUST_LOG`   | no       | `airlift=info`   | Tracing filter                  |
//! | `RPC_URL`    | no       | per network      | Chain RPC endpoint override     |

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airlift::build_trigger::BuildCommand;
use airlift::config::{AppConfig, ConfigSet};
use airlift::gate::{self, GateConfig};
use airlift::pipeline::{BootstrapContext, Pipeline};
use airlift::stages::{apply, provision, registry};

use airlift_chain::client::ChainClient;
use airlift_chain::rpc::RpcChain;
use airlift_core::keypair::Keypair;
use airlift_core::network::NetworkKind;
use airlift_core::sentinel::{Sentinel, DEFAULT_SENTINEL_FILE};
use airlift_oracle::mirror::{MirrorConfig, MirrorService};
use airlift_oracle::source::{HttpPriceSource, DEFAULT_SOURCE_URL};

#[derive(Debug, Parser)]
#[command(name = "airlift", about = "Localnet bootstrap and readiness orchestration")]
struct Cli {
    /// Network to bootstrap against.
    #[arg(short, long, global = true, default_value = "localnet")]
    network: NetworkKind,

    /// Path of the authority credential file.
    #[arg(long, global = true, default_value = "authority.json")]
    authority: PathBuf,

    /// Skip interactive confirmation prompts.
    #[arg(short = 'y', long, global = true)]
    no_confirm: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full bootstrap pipeline and keep mirroring until Ctrl-C.
    Run {
        #[command(flatten)]
        config: ConfigDirArg,

        /// Write the derived application config here.
        #[arg(long)]
        app_config: Option<PathBuf>,

        /// Airspace whose lookup tables the registry tracks.
        #[arg(long, default_value = "default")]
        airspace: String,

        #[command(flatten)]
        mirror: MirrorArgs,

        /// Build command to trigger once the environment is ready.
        #[arg(long)]
        build_command: Option<String>,
    },

    /// Generate and fund a fresh authority credential.
    Provision,

    /// Apply the declarative configuration set.
    Apply {
        #[command(flatten)]
        config: ConfigDirArg,
    },

    /// Derive the application config artifact from the set.
    GenerateConfig {
        #[command(flatten)]
        config: ConfigDirArg,

        /// Output path for the JSON artifact.
        #[arg(long, default_value = "app.config.json")]
        output: PathBuf,
    },

    /// Initialize the lookup-table registry for the authority.
    CreateRegistry,

    /// Refresh the registry's table set for an airspace.
    UpdateRegistry {
        #[command(flatten)]
        config: ConfigDirArg,

        #[arg(long, default_value = "default")]
        airspace: String,
    },

    /// Run only the oracle mirror, detached from the pipeline.
    Mirror {
        #[command(flatten)]
        mirror: MirrorArgs,
    },

    /// Block until the readiness sentinel of a detached mirror appears.
    Wait {
        /// Readiness sentinel path.
        #[arg(long, default_value = DEFAULT_SENTINEL_FILE)]
        sentinel: PathBuf,

        /// Seconds between existence checks.
        #[arg(long, default_value_t = 2)]
        poll_interval_secs: u64,

        /// Checks before giving up with a timeout error.
        #[arg(long, default_value_t = 150)]
        max_attempts: u32,
    },
}

#[derive(Debug, Args)]
struct ConfigDirArg {
    /// Directory holding the declarative configuration documents.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
}

#[derive(Debug, Args)]
struct MirrorArgs {
    /// Remote price source endpoint.
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    source_url: String,

    /// Rescale mirrored prices for the local oracle account layout.
    #[arg(long)]
    test_local: bool,

    /// Readiness sentinel path.
    #[arg(long, default_value = DEFAULT_SENTINEL_FILE)]
    sentinel: PathBuf,
}

impl MirrorArgs {
    fn to_config(&self) -> MirrorConfig {
        let mut config = MirrorConfig::new(Sentinel::new(&self.sentinel));
        config.test_local = self.test_local;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airlift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let rpc_url = std::env::var("RPC_URL")
        .unwrap_or_else(|_| cli.network.default_rpc_url().to_string());
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChain::new(rpc_url));

    match cli.command {
        Command::Run {
            config,
            app_config,
            airspace,
            mirror,
            build_command,
        } => {
            let mut ctx = BootstrapContext::localnet(config.config_dir, mirror.to_config());
            ctx.network = cli.network;
            ctx.authority_path = cli.authority;
            ctx.app_config_path = app_config;
            ctx.airspace = airspace;
            ctx.build = build_command.map(parse_build_command).transpose()?;

            let source = Arc::new(HttpPriceSource::new(mirror.source_url));
            let report = Pipeline::run(ctx, chain, source).await?;

            tracing::info!(
                authority = %report.authority,
                applied = report.apply.applied,
                unchanged = report.apply.unchanged,
                "Environment ready; mirroring until Ctrl-C",
            );

            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            report.mirror.shutdown().await;
        }

        Command::Provision => {
            provision::provision(
                chain.as_ref(),
                cli.network,
                &cli.authority,
                provision::DEFAULT_AIRDROP_LAMPORTS,
            )
            .await?;
        }

        Command::Apply { config } => {
            let set = ConfigSet::load(&config.config_dir)?;
            if !cli.no_confirm && !confirm(&format!(
                "Apply {} configuration document(s) to {}?",
                set.documents().len(),
                cli.network,
            ))? {
                anyhow::bail!("apply cancelled");
            }

            let authority = read_authority(&cli.authority)?;
            apply::apply_config(chain.as_ref(), &authority, &set).await?;
        }

        Command::GenerateConfig { config, output } => {
            let set = ConfigSet::load(&config.config_dir)?;
            let authority = read_authority(&cli.authority)?;
            AppConfig::from_config_set(&set, &authority).write_to_file(&output)?;
            tracing::info!(path = %output.display(), "Application config written");
        }

        Command::CreateRegistry => {
            let authority = read_authority(&cli.authority)?;
            if !cli.no_confirm
                && !confirm(&format!("Create the lookup registry on {}?", cli.network))?
            {
                anyhow::bail!("create-registry cancelled");
            }
            registry::create(chain.as_ref(), &authority).await?;
        }

        Command::UpdateRegistry { config, airspace } => {
            let set = ConfigSet::load(&config.config_dir)?;
            let authority = read_authority(&cli.authority)?;
            if !cli.no_confirm
                && !confirm(&format!(
                    "Replace the '{airspace}' lookup tables on {}?",
                    cli.network,
                ))?
            {
                anyhow::bail!("update-registry cancelled");
            }
            registry::update_for_airspace(chain.as_ref(), &authority, &set, &airspace).await?;
        }

        Command::Mirror { mirror } => {
            let config = mirror.to_config();
            config
                .sentinel
                .remove_stale()
                .context("removing stale sentinel")?;

            let source = Arc::new(HttpPriceSource::new(mirror.source_url));
            let handle = MirrorService::start(config, source, chain).await?;

            gate::wait_for_mirror(&handle, GateConfig::default().max_wait()).await?;
            tracing::info!("Mirror ready; running until Ctrl-C");

            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            handle.shutdown().await;
        }

        Command::Wait {
            sentinel,
            poll_interval_secs,
            max_attempts,
        } => {
            let config = GateConfig {
                poll_interval: Duration::from_secs(poll_interval_secs),
                max_attempts,
            };
            gate::wait_for_sentinel(&Sentinel::new(&sentinel), &config).await?;
        }
    }

    Ok(())
}

/// Split a `--build-command` string into program and arguments.
///
/// The build after a bootstrap run is always a forced full rebuild:
/// incremental state predates the fresh environment.
fn parse_build_command(raw: String) -> anyhow::Result<BuildCommand> {
    let mut parts = raw.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("--build-command is empty"))?;

    let mut command = BuildCommand::new(program);
    command.args = parts.collect();
    command.force = true;
    command.timeout = Duration::from_secs(600);
    Ok(command)
}

fn read_authority(path: &std::path::Path) -> anyhow::Result<airlift_core::keypair::Pubkey> {
    let keypair = Keypair::read_from_file(path)
        .with_context(|| format!("reading authority credential from {}", path.display()))?;
    Ok(keypair.pubkey())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_always_forces_full_rebuild() {
        let command = parse_build_command("turbo build".into()).unwrap();
        assert_eq!(command.program, "turbo");
        assert_eq!(command.args, vec!["build"]);
        assert!(command.force);
    }

    #[test]
    fn empty_build_command_rejected() {
        assert!(parse_build_command("   ".into()).is_err());
    }

    #[test]
    fn wait_subcommand_parses_gate_bounds() {
        let cli = Cli::try_parse_from([
            "airlift",
            "wait",
            "--poll-interval-secs",
            "1",
            "--max-attempts",
            "5",
        ])
        .unwrap();

        match cli.command {
            Command::Wait {
                poll_interval_secs,
                max_attempts,
                ..
            } => {
                assert_eq!(poll_interval_secs, 1);
                assert_eq!(max_attempts, 5);
            }
            other => panic!("expected wait, got {other:?}"),
        }
    }

    #[test]
    fn no_confirm_applies_to_registry_subcommands() {
        let cli = Cli::try_parse_from(["airlift", "create-registry", "-y"]).unwrap();
        assert!(cli.no_confirm);

        let cli = Cli::try_parse_from(["airlift", "update-registry", "--no-confirm"]).unwrap();
        assert!(cli.no_confirm);
    }
}
