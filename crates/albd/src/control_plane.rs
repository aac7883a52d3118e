//! Control plane mode — registry REST API plus propagation to the proxy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use alb_control::ControlPlane;
use alb_sync::HttpSyncClient;

use crate::{SyncArgs, shutdown_signal};

pub async fn run_control_plane(addr: SocketAddr, sync: SyncArgs) -> anyhow::Result<()> {
    info!("ALB daemon starting in control-plane mode");

    let timeout = Duration::from_secs(sync.sync_timeout);
    let sync_client = HttpSyncClient::new(sync.proxy_url.clone()).with_timeout(timeout);
    let plane = Arc::new(ControlPlane::new(Arc::new(sync_client)));
    info!(
        proxy_url = %sync.proxy_url,
        timeout_secs = sync.sync_timeout,
        "sync client configured"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server starting");

    axum::serve(listener, alb_api::build_router(plane))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("control plane stopped");
    Ok(())
}
