use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventglobe::{App, Config, CycleOutcome, Snapshot};

/// Keep a renderer's event snapshot in step with the GDELT feed.
#[derive(Debug, Parser)]
#[command(name = "eventglobe", version)]
struct Cli {
    /// Config file (default: <config dir>/eventglobe/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write each snapshot as JSON here (overrides the config file)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(CycleOutcome::Updated { .. }) => ExitCode::SUCCESS,
        Ok(CycleOutcome::Failed { message }) => {
            error!(%message, "stopped after failed update");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "fatal");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventglobe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: Cli) -> Result<CycleOutcome> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.output.is_some() {
        config.output.snapshot_path = cli.output;
    }
    let output = config.output.snapshot_path.clone();

    // Cooperative single-threaded model: one cycle at a time.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    rt.block_on(async move {
        let (app, snapshots) = App::new(config).context("failed to build HTTP client")?;

        let writer = output.clone().map(|path| tokio::spawn(export_snapshots(path, snapshots.clone())));
        let outcome = app.run(cli.once).await;

        if let Some(writer) = writer {
            writer.abort();
        }
        if let Some(path) = output {
            let latest = snapshots.borrow().clone();
            write_snapshot(&path, &latest).await?;
        }
        Ok::<_, anyhow::Error>(outcome)
    })
}

/// Hand every new snapshot to the renderer through the output file.
async fn export_snapshots(path: PathBuf, mut snapshots: watch::Receiver<std::sync::Arc<Snapshot>>) {
    while snapshots.changed().await.is_ok() {
        let latest = snapshots.borrow_and_update().clone();
        if let Err(e) = write_snapshot(&path, &latest).await {
            error!(error = %format!("{:#}", e), "failed to export snapshot");
        }
    }
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize snapshot")?;
    // write then rename so a reader never sees half a file
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;
    info!(path = %path.display(), failed = snapshot.is_failed(), "snapshot exported");
    Ok(())
}
