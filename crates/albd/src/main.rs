//! albd — the ALB daemon.
//!
//! One binary, one subcommand per process role:
//! - `control-plane`: registry REST API, pushes node lists to the proxy
//! - `adapter`: accepts pushes and rewrites the nginx upstream file
//! - `crawler`: samples node metrics and feeds them to a remote control plane
//! - `standalone`: all three in one process
//!
//! # Usage
//!
//! ```text
//! albd control-plane --port 5000 --proxy-url http://proxy:5001
//! albd adapter --port 5001 --upstream-path /etc/nginx/upstream.conf
//! albd crawler --api-url http://control:5000 --username ops
//! ```

mod adapter_mode;
mod control_plane;
mod crawler;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use alb_control::ControlPlane;
use alb_sync::HttpSyncClient;
use alb_telemetry::{RegistryHandle, SshExecutor, Sweeper};

/// Used when `RUST_LOG` is unset: debug for every workspace crate.
const DEFAULT_LOG_FILTER: &str = "info,albd=debug,alb_registry=debug,alb_sync=debug,\
alb_control=debug,alb_api=debug,alb_adapter=debug,alb_telemetry=debug";

#[derive(Parser)]
#[command(name = "albd", about = "ALB load balancer daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the registry API and push changes to the proxy adapter.
    ControlPlane {
        #[command(flatten)]
        listen: Listen,

        /// Port to listen on.
        #[arg(long, env = "PORT", default_value = "5000")]
        port: u16,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Serve the proxy adapter that rewrites the upstream file.
    Adapter {
        #[command(flatten)]
        listen: Listen,

        /// Port to listen on.
        #[arg(long, env = "PORT", default_value = "5001")]
        port: u16,

        #[command(flatten)]
        upstream: UpstreamArgs,
    },

    /// Sample node metrics and write them to a remote control plane.
    Crawler {
        /// Base URL of the control plane API.
        #[arg(long, env = "API_URL", default_value = "http://localhost:5000")]
        api_url: String,

        /// Timeout for control plane requests, in seconds.
        #[arg(long, env = "SYNC_TIMEOUT", default_value = "10")]
        sync_timeout: u64,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Run the control plane, adapter and crawler in one process.
    Standalone {
        #[command(flatten)]
        listen: Listen,

        /// Control plane API port.
        #[arg(long, env = "PORT", default_value = "5000")]
        port: u16,

        /// Adapter port.
        #[arg(long, env = "ADAPTER_PORT", default_value = "5001")]
        adapter_port: u16,

        #[command(flatten)]
        sync: SyncArgs,

        #[command(flatten)]
        upstream: UpstreamArgs,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
}

#[derive(Args)]
struct Listen {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
}

#[derive(Args)]
struct SyncArgs {
    /// Base URL of the proxy adapter.
    #[arg(long, env = "PROXY_URL", default_value = "http://localhost:5001")]
    proxy_url: String,

    /// Timeout for pushes to the proxy adapter, in seconds.
    #[arg(long, env = "SYNC_TIMEOUT", default_value = "10")]
    sync_timeout: u64,
}

#[derive(Args)]
struct UpstreamArgs {
    /// Upstream file rewritten on every push.
    #[arg(long, env = "UPSTREAM_PATH", default_value = "/etc/nginx/upstream.conf")]
    upstream_path: PathBuf,

    /// Command that makes the proxy reload the upstream file.
    #[arg(long, env = "NOTIFY_NGINX_COMMAND", default_value = "service nginx reload")]
    reload_command: String,
}

#[derive(Args)]
struct CrawlArgs {
    /// Remote user for metric collection (ssh default when unset).
    #[arg(long, env = "USERNAME")]
    username: Option<String>,

    /// ssh client used to run collection commands.
    #[arg(long, env = "SSH_PROGRAM", default_value = "ssh")]
    ssh_program: String,

    /// Seconds between sweeps.
    #[arg(long, env = "INTERVAL", default_value = "10")]
    interval: u64,

    /// Maximum nodes sampled at once.
    #[arg(long, env = "MAX_CONCURRENCY", default_value = "16")]
    max_concurrency: usize,

    /// Seconds a single sample may take before it counts as failed.
    #[arg(long, env = "SAMPLE_TIMEOUT", default_value = "30")]
    sample_timeout: u64,
}

impl CrawlArgs {
    fn executor(&self) -> SshExecutor {
        SshExecutor::new(self.ssh_program.clone()).with_username(self.username.clone())
    }

    fn sweeper(&self, registry: Arc<dyn RegistryHandle>) -> Sweeper {
        Sweeper::new(registry, Arc::new(self.executor()))
            .with_interval(Duration::from_secs(self.interval))
            .with_max_concurrency(self.max_concurrency)
            .with_sample_timeout(Duration::from_secs(self.sample_timeout))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ControlPlane { listen, port, sync } => {
            control_plane::run_control_plane(listen.addr(port)?, sync).await
        }
        Command::Adapter {
            listen,
            port,
            upstream,
        } => adapter_mode::run_adapter(listen.addr(port)?, upstream).await,
        Command::Crawler {
            api_url,
            sync_timeout,
            crawl,
        } => crawler::run_crawler(api_url, Duration::from_secs(sync_timeout), crawl).await,
        Command::Standalone {
            listen,
            port,
            adapter_port,
            sync,
            upstream,
            crawl,
        } => {
            run_standalone(
                listen.addr(port)?,
                listen.addr(adapter_port)?,
                sync,
                upstream,
                crawl,
            )
            .await
        }
    }
}

impl Listen {
    fn addr(&self, port: u16) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{port}", self.host)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address '{}:{port}': {e}", self.host))?;
        Ok(addr)
    }
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn run_standalone(
    api_addr: SocketAddr,
    adapter_addr: SocketAddr,
    sync: SyncArgs,
    upstream: UpstreamArgs,
    crawl: CrawlArgs,
) -> anyhow::Result<()> {
    info!("ALB daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    let store = adapter_mode::open_store(&upstream)?;

    let sync_client = HttpSyncClient::new(sync.proxy_url.clone())
        .with_timeout(Duration::from_secs(sync.sync_timeout));
    let plane = Arc::new(ControlPlane::new(Arc::new(sync_client)));
    info!(proxy_url = %sync.proxy_url, "control plane initialized");

    let sweeper = crawl.sweeper(plane.clone());
    info!(
        interval = crawl.interval,
        sample_timeout = crawl.sample_timeout,
        "sweeper initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_shutdown = shutdown_rx.clone();
    let mut adapter_shutdown = shutdown_rx.clone();

    // ── Start background tasks ─────────────────────────────────

    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_shutdown).await;
    });

    let adapter_listener = tokio::net::TcpListener::bind(adapter_addr).await?;
    info!(addr = %adapter_addr, "adapter server starting");
    let adapter_handle = tokio::spawn(async move {
        axum::serve(adapter_listener, alb_adapter::build_router(store))
            .with_graceful_shutdown(async move {
                let _ = adapter_shutdown.changed().await;
            })
            .await
    });

    // ── Start API server ───────────────────────────────────────

    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    info!(addr = %api_addr, "API server starting");

    axum::serve(listener, alb_api::build_router(plane))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = sweeper_handle.await;
    adapter_handle.await??;

    info!("ALB daemon stopped");
    Ok(())
}
