// Terminal client for the OAuth token retrieval repro
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use tokenrepro_common::AppConfig;
use tokenrepro_common::models::Platform;
use tokenrepro_core::auth::KeyringTokenCache;
use tokenrepro_core::platforms::clerk::ClerkFrontend;
use tokenrepro_core::storage::FileKeyValueStore;
use tokenrepro_core::{DefaultHttpClient, HttpClient, LogStore, SignInOrchestrator, TokenCheckClient};
use tokenrepro_tui::{App, ConsoleNotifier};

#[derive(Parser, Debug, Clone)]
#[command(name = "tokenrepro")]
#[command(author, version, about = "Sign in and retrieve a cached OAuth access token through the backend")]
struct Args {
    /// Directory for the retrieval history (overrides TOKENREPRO_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Backend base URL (overrides TOKENREPRO_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Social provider to sign in with (overrides TOKENREPRO_PLATFORM)
    #[arg(long)]
    platform: Option<Platform>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tokenrepro_core=warn,tokenrepro_tui=warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::from_env().context("loading configuration")?;
    let platform = args.platform.unwrap_or(config.target_platform);
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let api_url = args.api_url.unwrap_or_else(|| config.api_url.clone());

    let http: Arc<dyn HttpClient> = Arc::new(DefaultHttpClient::new());
    let notifier = Arc::new(ConsoleNotifier);

    let frontend = Arc::new(ClerkFrontend::new(
        http.clone(),
        &config.publishable_key.frontend_api_url(),
        Arc::new(KeyringTokenCache::default()),
        config.callback_port,
    ));
    if let Err(e) = frontend.restore().await {
        warn!("Could not restore the previous session: {}", e);
    }

    let logs = Arc::new(LogStore::new(Arc::new(FileKeyValueStore::new(data_dir))));
    logs.load().await;

    let sign_in = SignInOrchestrator::new(frontend.clone(), frontend.clone(), notifier.clone(), platform);
    let checker = TokenCheckClient::new(http, frontend.clone(), logs.clone(), notifier.clone(), &api_url);
    let mut app = App::new(frontend, sign_in, checker, logs, notifier);

    app.refresh_user().await;
    println!("{}", app.render().await);
    println!("\nType 'help' for available commands.\n");

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("tokenrepro> ");
        stdout().flush()?;

        let line = match reader.next_line().await? {
            Some(line) => line.trim().to_string(),
            None => break,
        };
        if line.is_empty() {
            continue;
        }

        let (quit_requested, output) = app.dispatch(&line).await;
        if let Some(msg) = output {
            println!("{}", msg);
        }
        if quit_requested {
            break;
        }
    }

    Ok(())
}
