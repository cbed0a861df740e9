use anyhow::{bail, Context};
use serde::Serialize;
use stakeline_core::{logging, ReconcilerConfig};
use stakeline_ledger::HttpLedgerClient;
use stakeline_reconciler::{ReconcilerEngine, Scheduler};
use stakeline_store::HasuraMissionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    once: bool,
    version_json: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args_iter = args.iter().skip(1);

    while let Some(arg) = args_iter.next() {
        match arg.as_str() {
            "--config" => match args_iter.next() {
                Some(path) => parsed.config_path = Some(PathBuf::from(path)),
                None => bail!("--config was provided without a path"),
            },
            "--once" => parsed.once = true,
            "--version-json" => parsed.version_json = true,
            other => bail!("unrecognized argument '{}'", other),
        }
    }

    Ok(parsed)
}

fn load_config(args: &CliArgs) -> anyhow::Result<ReconcilerConfig> {
    let config = match &args.config_path {
        Some(path) => {
            let config = ReconcilerConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?
                .with_runtime_overrides()
                .context("applying environment overrides")?;
            config.validate()?;
            config
        }
        None => ReconcilerConfig::load().context("failed to load configuration")?,
    };
    Ok(config)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;

    if cli.version_json {
        let info = VersionInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        };
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }

    let config = load_config(&cli)?;
    logging::init_with(config.logging.json);

    let store = HasuraMissionStore::new(&config.store).context("failed to build store client")?;
    let ledger = HttpLedgerClient::new(&config.ledger).context("failed to build ledger client")?;

    info!(
        store = %config.store.endpoint,
        rpc = %config.ledger.rpc_url,
        transfers = %config.ledger.transfer_service_url,
        cadence_ms = config.engine.cadence_ms,
        retry_bound = config.engine.retry_bound,
        "Stakeline reconciler starting"
    );

    let mut engine = ReconcilerEngine::from_config(Arc::new(store), Arc::new(ledger), &config);

    if cli.once {
        let report = engine.run_pass().await;
        let failed = report.failed_phases();
        if !failed.is_empty() {
            bail!("phases failed: {}", failed.join(", "));
        }
        return Ok(());
    }

    let engine = Scheduler::new(engine).run_until(shutdown_signal()).await;
    info!(passes = engine.passes(), "Stakeline reconciler stopped");
    Ok(())
}
