//! Crawler mode — the telemetry sweeper against a remote control plane.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use alb_telemetry::RemoteRegistry;

use crate::{CrawlArgs, shutdown_signal};

pub async fn run_crawler(
    api_url: String,
    timeout: Duration,
    crawl: CrawlArgs,
) -> anyhow::Result<()> {
    info!(%api_url, "ALB daemon starting in crawler mode");

    let registry = RemoteRegistry::new(api_url).with_timeout(timeout);
    let sweeper = crawl.sweeper(Arc::new(registry));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    sweeper.run(shutdown_rx).await;
    signal.abort();

    info!("crawler stopped");
    Ok(())
}
