//! vsfetch - live network feed poller

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vsfetch_client::{build_http_client, SourceClient, StoreClient};
use vsfetch_server::config::DEFAULT_CONFIG_PATH;
use vsfetch_server::{run_poll_loop, Config, CycleOutcome, Pipeline, ReferenceData};

#[derive(Parser)]
#[command(name = "vsfetch")]
#[command(about = "Sync live network state into the versioned object store", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "VSFETCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "VSFETCH_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = Config::load(&cli.config)?;
    tracing::info!("Starting vsfetch with config {}", cli.config.display());

    let http = build_http_client()?;
    let source = SourceClient::new(http.clone(), config.source_urls(), config.external_timeout());
    let store = StoreClient::new(http, config.versioned_endpoint(), config.tracked_endpoint());
    let reference = Arc::new(ReferenceData::new(source.clone()));
    let pipeline = Arc::new(Pipeline::new(source, store, reference.clone()));

    if cli.once {
        match pipeline.process(None).await? {
            CycleOutcome::Processed { version, reports } => {
                for report in reports {
                    tracing::info!(
                        "{}: {} upserted, {} removed",
                        report.namespace,
                        report.upserted,
                        report.deleted
                    );
                }
                tracing::info!("processed snapshot {}", version);
            }
            CycleOutcome::Stale { version } => {
                tracing::info!("snapshot {} not newer, nothing stored", version);
            }
        }
        return Ok(());
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let poll_handle = tokio::spawn(run_poll_loop(
        pipeline,
        config.poll.clone(),
        shutdown_tx.subscribe(),
    ));

    #[cfg(unix)]
    tokio::spawn(reload_on_sighup(reference, shutdown_tx.subscribe()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down...");
    let _ = shutdown_tx.send(());

    if let Err(err) = poll_handle.await {
        tracing::error!("poll loop error: {}", err);
    }
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("vsfetch_server=info".parse()?)
        .add_directive("vsfetch_client=info".parse()?)
        .add_directive("vsfetch_core=info".parse()?);

    if json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

#[cfg(unix)]
async fn reload_on_sighup(
    reference: Arc<ReferenceData<SourceClient>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(err) => {
            tracing::warn!("SIGHUP handler unavailable: {}", err);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, reloading reference data");
                if let Err(err) = reference.reload().await {
                    tracing::warn!("reference reload failed, keeping cached data: {:#}", err);
                }
            }
        }
    }
}
