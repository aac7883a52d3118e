//! Adapter mode — accepts node lists and rewrites the upstream file.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use alb_adapter::{CommandReloader, UpstreamStore};

use crate::{UpstreamArgs, shutdown_signal};

pub fn open_store(upstream: &UpstreamArgs) -> anyhow::Result<Arc<UpstreamStore>> {
    let reloader = CommandReloader::parse(&upstream.reload_command)?;
    info!(
        path = ?upstream.upstream_path,
        reload = %reloader.command_line(),
        "upstream store configured"
    );
    Ok(Arc::new(UpstreamStore::new(
        upstream.upstream_path.clone(),
        Arc::new(reloader),
    )))
}

pub async fn run_adapter(addr: SocketAddr, upstream: UpstreamArgs) -> anyhow::Result<()> {
    info!("ALB daemon starting in adapter mode");

    let store = open_store(&upstream)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "adapter server starting");

    axum::serve(listener, alb_adapter::build_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("adapter stopped");
    Ok(())
}
