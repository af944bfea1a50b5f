use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use guidex_core::acronym::AcronymMatcher;
use guidex_core::acronym_store::{AcronymStore, MemoryAcronymStore, SledAcronymStore};
use guidex_core::reload::{ChangeSignal, SharedIndex};
use guidex_server::catalog::Catalog;
use guidex_server::loader::{self, FileWatch};
use guidex_server::{build_app, AppState};

#[derive(Parser)]
struct Args {
    /// Guide data file (JSON export of the maintained spreadsheet)
    #[arg(long, default_value = "./data/guide.json")]
    data: String,
    /// Directory for the durable acronym store; omitted means in-memory
    #[arg(long)]
    store: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Seconds between checks of the data file for modifications
    #[arg(long, default_value_t = 5)]
    poll_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let store: Arc<dyn AcronymStore> = match &args.store {
        Some(path) => Arc::new(SledAcronymStore::open(path)?),
        None => Arc::new(MemoryAcronymStore::new()),
    };

    let state = AppState {
        index: SharedIndex::new(),
        catalog: Arc::new(Catalog::new()),
        acronyms: Arc::new(AcronymMatcher::new(store)),
        watch: Arc::new(FileWatch::new(&args.data)),
        change: Arc::new(ChangeSignal::new()),
    };

    match loader::load_data(state.watch.path(), &state.catalog, &state.index) {
        Ok(message) => tracing::info!(%message, "initial load complete"),
        Err(err) => tracing::warn!(error = %err, "starting with empty data"),
    }
    // Baseline the mtime so the poller only reports edits made after startup.
    state.watch.changed();

    let poll_secs = args.poll_secs.max(1);
    let poll_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(poll_secs));
        loop {
            ticker.tick().await;
            if poll_state.watch.changed() {
                tracing::info!("guide data file modified, scheduling reload");
                poll_state.change.mark_changed();
            }
        }
    });

    let app: Router = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
