use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum_server::Handle;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tokenrepro_common::AppConfig;
use tokenrepro_core::DefaultHttpClient;
use tokenrepro_core::platforms::clerk::ClerkBackend;
use tokenrepro_server::{serve, ServerState};

#[derive(Parser, Debug, Clone)]
#[command(name = "tokenrepro-server")]
#[command(author, version, about = "Backend endpoint that relays cached OAuth access tokens")]
struct Args {
    /// Address to which the server will bind
    #[arg(long, default_value = "127.0.0.1:8081")]
    addr: String,

    /// Identity platform backend API base URL (overrides CLERK_API_URL)
    #[arg(long)]
    backend_api_url: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tokenrepro=info,tokenrepro_server=info,tower_http=info"));
    fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::from_env().context("loading configuration")?;
    let secret_key = config.require_secret_key()?.to_string();
    let backend_api_url = args
        .backend_api_url
        .clone()
        .unwrap_or_else(|| config.backend_api_url.clone());
    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("invalid --addr {}", args.addr))?;

    let backend = Arc::new(ClerkBackend::new(
        Arc::new(DefaultHttpClient::new()),
        &backend_api_url,
        secret_key,
    ));
    let state = ServerState {
        authenticator: backend.clone(),
        tokens: backend,
        platform: config.target_platform,
    };

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown.graceful_shutdown(Some(Duration::from_secs(5)));
        }
    });

    if let Err(e) = serve(addr, state, handle).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Server stopped. Goodbye!");
    Ok(())
}
