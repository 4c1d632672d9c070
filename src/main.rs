use anyhow::{anyhow, Context, Result};
use bananascan::{
    Config, DecisionGate, DeliveryOutcome, HttpBackend, HttpVerifier, LocationAcquirer,
    ModelLoader, NetworkMonitor, OfflineQueue, PersistenceRouter, ScanOutcome, ScanPipeline,
    SyncEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bananascan=info")),
        )
        .init();

    bananascan::metrics::register_metrics();

    let config = Config::load()?;
    info!(platform = ?config.platform, "Configuration loaded");

    let image_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: bananascan <image-file>"))?;
    let image_bytes = tokio::fs::read(&image_path)
        .await
        .with_context(|| format!("reading {}", image_path))?;

    let http_timeout = Duration::from_secs(config.http_timeout_secs);

    let queue = Arc::new(OfflineQueue::open(format!("{}/queue", config.data_dir))?);
    let network = Arc::new(NetworkMonitor::new(true));
    let target = Arc::new(HttpBackend::new(
        config.endpoints.scan_url.clone(),
        config.endpoints.upload_url.clone(),
        config.endpoints.geocode_url.clone(),
        http_timeout,
    )?);
    let verifier = Arc::new(HttpVerifier::new(
        config.endpoints.verifier_url.clone(),
        http_timeout,
    )?);

    // A model load failure disables scanning entirely; no automatic retry.
    let loader = ModelLoader::new(&config.model_path);
    let classifier = loader.get().await?;

    let pipeline = ScanPipeline::new(
        classifier,
        DecisionGate::new(verifier),
        LocationAcquirer::for_platform(
            config.platform,
            Duration::from_secs(config.location_timeout_secs),
        ),
        PersistenceRouter::new(Arc::clone(&network), target.clone(), Arc::clone(&queue)),
        Arc::clone(&network),
    );

    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&queue),
        target,
        config.sync_config.clone(),
    ));
    let _auto_sync = engine.spawn_auto_sync(&network);

    match pipeline.run_scan(&image_bytes).await? {
        ScanOutcome::Rejected(reason) => {
            println!("Scan rejected: {:?}. Please retake the photo.", reason);
        }
        outcome @ ScanOutcome::Completed { .. } => {
            let top = outcome.top_label().expect("completed scan has a top label");
            println!("Detected: {} ({:.2}%)", top.label, top.percentage);
            if let Some(advice) = outcome.advice() {
                println!("{}: {}", advice.display_name, advice.recommendation);
            }
            if let ScanOutcome::Completed { delivery, .. } = &outcome {
                match delivery {
                    DeliveryOutcome::Direct => println!("Result submitted to the backend."),
                    DeliveryOutcome::Queued => println!("Offline: result saved for later sync."),
                }
            }
        }
    }

    // Opportunistically drain anything still pending.
    if let Some(report) = engine.sync_all().await? {
        if report.attempted > 0 {
            println!(
                "Sync pass: {}/{} records delivered",
                report.synced, report.attempted
            );
            for error in &report.errors {
                eprintln!("sync error: {}", error);
            }
        }
    }

    let stats = queue.stats(config.sync_config.max_retries)?;
    info!(
        pending = stats.pending,
        terminal = stats.terminal,
        "Queue state at exit"
    );

    Ok(())
}
