//! End-to-end pipeline runs against the in-memory chain.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use airlift::build_trigger::BuildCommand;
use airlift::gate::{GateConfig, GateError};
use airlift::pipeline::{BootstrapContext, Pipeline, PipelineError};

use airlift_chain::client::ChainClient;
use airlift_chain::mock::MockChain;
use airlift_core::backoff::RetryPolicy;
use airlift_core::keypair::Keypair;
use airlift_core::sentinel::Sentinel;
use airlift_oracle::mirror::{MirrorConfig, MirrorError};
use airlift_oracle::source::{PriceSource, PriceUpdate, SourceError};

struct ScriptedSource {
    healthy: bool,
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_prices(&self) -> Result<Vec<PriceUpdate>, SourceError> {
        if self.healthy {
            Ok(vec![
                PriceUpdate {
                    feed: "SOL".into(),
                    price: 14_512_000_000,
                    confidence: 3_000_000,
                    exponent: -8,
                },
                PriceUpdate {
                    feed: "USDC".into(),
                    price: 100_000_000,
                    confidence: 10_000,
                    exponent: -8,
                },
            ])
        } else {
            Err(SourceError::Transport("unreachable".into()))
        }
    }
}

fn write_config_set(dir: &Path) {
    fs::write(
        dir.join("default.toml"),
        r#"
name = "default"
is_restricted = false

[[tokens]]
symbol = "USDC"
name = "USD Coin"
decimals = 6
feed = "USDC"

[[tokens]]
symbol = "SOL"
name = "Solana"
decimals = 9
feed = "SOL"
"#,
    )
    .unwrap();
}

fn fast_context(root: &Path) -> BootstrapContext {
    let config_dir = root.join("config");
    fs::create_dir(&config_dir).unwrap();
    write_config_set(&config_dir);

    let backoff = RetryPolicy {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    };

    let mut mirror = MirrorConfig::new(Sentinel::in_dir(root));
    mirror.sync_interval = Duration::from_millis(10);
    mirror.startup_attempts = 3;
    mirror.startup_backoff = backoff.clone();
    mirror.retry_backoff = backoff;
    mirror.test_local = true;

    let mut ctx = BootstrapContext::localnet(config_dir, mirror);
    ctx.authority_path = root.join("authority.json");
    ctx.gate = GateConfig {
        poll_interval: Duration::from_millis(10),
        max_attempts: 100,
    };
    ctx
}

#[tokio::test]
async fn full_run_reaches_ready_and_triggers_build_once() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("build.marker");

    let mut ctx = fast_context(dir.path());
    ctx.app_config_path = Some(dir.path().join("app.config.json"));
    // `--force` lands after the script, so `sh -c` sees it as $0.
    let mut build = BuildCommand::new("/bin/sh")
        .arg("-c")
        .arg(format!("echo ran \"$0\" >> {}", marker.display()));
    build.force = true;
    ctx.build = Some(build);
    let sentinel = ctx.mirror.sentinel.clone();

    let chain = Arc::new(MockChain::new());
    let report = Pipeline::run(ctx, chain.clone(), Arc::new(ScriptedSource { healthy: true }))
        .await
        .unwrap();

    // Readiness artifacts all exist.
    assert!(sentinel.exists());
    assert!(report.mirror.is_ready());
    assert!(chain.publish_count() >= 2);

    // Build ran exactly once, as a forced full rebuild.
    assert_eq!(fs::read_to_string(&marker).unwrap(), "ran --force\n");

    // Airspace + two tokens applied; authority persisted and funded.
    assert_eq!(report.apply.applied, 3);
    let restored = Keypair::read_from_file(&dir.path().join("authority.json")).unwrap();
    assert_eq!(restored.pubkey(), report.authority);
    assert!(chain.balance(&report.authority) > 0);

    // The derived app config names the run's authority.
    let app: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("app.config.json")).unwrap())
            .unwrap();
    assert_eq!(
        app["airspaces"][0]["lookupRegistryAuthority"],
        serde_json::json!(report.authority.as_str()),
    );

    // Registry tracks a mint and a pool per token.
    let tables = chain
        .registry_tables(&report.authority, "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tables.len(), 4);

    report.mirror.shutdown().await;
}

#[tokio::test]
async fn unreachable_source_fails_before_any_readiness() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fast_context(dir.path());
    let sentinel = ctx.mirror.sentinel.clone();

    let err = Pipeline::run(
        ctx,
        Arc::new(MockChain::new()),
        Arc::new(ScriptedSource { healthy: false }),
    )
    .await
    .unwrap_err();

    assert_matches!(
        err,
        PipelineError::Mirror(MirrorError::SourceUnreachable { attempts: 3, .. })
    );
    assert!(!sentinel.exists());
}

#[tokio::test]
async fn gate_timeout_shuts_mirror_down_and_skips_build() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("build.marker");

    let mut ctx = fast_context(dir.path());
    ctx.gate = GateConfig {
        poll_interval: Duration::from_millis(10),
        max_attempts: 5,
    };
    ctx.build = Some(
        BuildCommand::new("/bin/sh")
            .arg("-c")
            .arg(format!("echo ran >> {}", marker.display())),
    );
    let sentinel = ctx.mirror.sentinel.clone();

    // Source is fine but the local chain rejects every publish, so the
    // mirror never becomes ready.
    let chain = Arc::new(MockChain::new());
    chain.fail_publishes();

    let start = std::time::Instant::now();
    let err = Pipeline::run(ctx, chain, Arc::new(ScriptedSource { healthy: true }))
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Gate(GateError::Timeout { .. }));
    assert!(!sentinel.exists());
    assert!(!marker.exists());
    // Bounded: 5 x 10ms budget plus shutdown, far under a second.
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn failing_build_shuts_mirror_down() {
    let dir = tempfile::tempdir().unwrap();

    let mut ctx = fast_context(dir.path());
    ctx.build = Some(BuildCommand::new("/bin/sh").arg("-c").arg("exit 7"));

    let err = Pipeline::run(
        ctx,
        Arc::new(MockChain::new()),
        Arc::new(ScriptedSource { healthy: true }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, PipelineError::Build(_));
}

#[tokio::test]
async fn rerun_converges_with_fresh_authority() {
    let dir = tempfile::tempdir().unwrap();
    let chain = Arc::new(MockChain::new());

    let first = Pipeline::run(
        fast_context(dir.path()),
        chain.clone(),
        Arc::new(ScriptedSource { healthy: true }),
    )
    .await
    .unwrap();
    first.mirror.shutdown().await;

    // Second run: new authority, stale sentinel cleared, config entries
    // already on chain come back unchanged.
    let second = Pipeline::run(
        fast_context2(dir.path()),
        chain.clone(),
        Arc::new(ScriptedSource { healthy: true }),
    )
    .await
    .unwrap();

    assert_ne!(first.authority, second.authority);
    assert_eq!(second.apply.applied, 0);
    assert_eq!(second.apply.unchanged, 3);

    second.mirror.shutdown().await;
}

/// Like [`fast_context`] but reusing the directory from a previous run.
fn fast_context2(root: &Path) -> BootstrapContext {
    let config_dir = root.join("config");

    let backoff = RetryPolicy {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    };

    let mut mirror = MirrorConfig::new(Sentinel::in_dir(root));
    mirror.sync_interval = Duration::from_millis(10);
    mirror.startup_attempts = 3;
    mirror.startup_backoff = backoff.clone();
    mirror.retry_backoff = backoff;
    mirror.test_local = true;

    let mut ctx = BootstrapContext::localnet(config_dir, mirror);
    ctx.authority_path = root.join("authority.json");
    ctx.gate = GateConfig {
        poll_interval: Duration::from_millis(10),
        max_attempts: 100,
    };
    ctx
}
