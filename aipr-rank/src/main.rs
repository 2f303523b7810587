//! aipr-rank - AI Power Rankings service
//!
//! Serves rankings, tools and news over HTTP and offers one-shot commands
//! for building periods, deleting periods and ingesting articles.

use std::net::SocketAddr;
use std::path::PathBuf;

use aipr_common::config::{resolve_data_dir, StorageBackend, TomlConfig};
use aipr_common::events::EventBus;
use aipr_rank::services::{
    delete_period_and_relink, ingest_article, BuildOptions, IngestRequest, RankingBuilder,
};
use aipr_rank::{build_router, open_repositories, AppState};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5780;

/// Command-line arguments for aipr-rank
#[derive(Parser, Debug)]
#[command(name = "aipr-rank")]
#[command(about = "AI coding tool rankings service")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/aipr/config.toml)
    #[arg(long, global = true, env = "AIPR_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the JSON documents or SQLite database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: json or sqlite (overrides the config file)
    #[arg(long, global = true, env = "AIPR_STORAGE")]
    storage: Option<StorageBackend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(short, long, env = "AIPR_PORT")]
        port: Option<u16>,
    },
    /// Compute and store a ranking period
    Build {
        /// `YYYY-MM` or `YYYY-MM-DD`
        period: String,
        /// Rank as of this date (YYYY-MM-DD)
        #[arg(long)]
        preview_date: Option<NaiveDate>,
        /// Run AI qualitative analysis over recent news
        #[arg(long)]
        enable_ai: bool,
        /// Make the new period current
        #[arg(long)]
        set_current: bool,
    },
    /// Delete a ranking period and re-link the following one
    DeletePeriod { period: String },
    /// Ingest a news article from a JSON file
    Ingest { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml_config = TomlConfig::load_or_default(cli.config.as_deref());

    let default_filter = EnvFilter::try_new(&toml_config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(default_filter))
        .init();

    info!(
        "Starting aipr-rank v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_dir = resolve_data_dir(cli.data_dir.as_deref(), &toml_config);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    let backend = cli.storage.unwrap_or(toml_config.storage);
    info!(data_dir = %data_dir.display(), ?backend, "Opening repositories");

    let repos = open_repositories(backend, &data_dir)
        .await
        .context("Failed to open repositories")?;
    let event_bus = EventBus::new(100);
    let extractor = aipr_rank::config::build_extractor(&toml_config);

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        port: None,
    }) {
        Command::Serve { bind, port } => {
            let bind = bind
                .or_else(|| toml_config.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string());
            let port = port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
            let addr: SocketAddr = format!("{}:{}", bind, port)
                .parse()
                .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

            let state = AppState::new(repos, event_bus).with_extractor(extractor);
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
            info!("Server shutdown complete");
        }
        Command::Build {
            period,
            preview_date,
            enable_ai,
            set_current,
        } => {
            if enable_ai && extractor.is_none() {
                warn!("--enable-ai given but no OpenRouter API key is configured");
            }
            let options = BuildOptions {
                preview_date,
                enable_ai,
                set_current,
            };
            let summary = RankingBuilder::new(repos)
                .with_extractor(extractor)
                .with_event_bus(event_bus)
                .build(&period, &options)
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::DeletePeriod { period } => {
            let outcome = delete_period_and_relink(repos.rankings.as_ref(), &period).await?;
            if !outcome.deleted {
                anyhow::bail!("Ranking period not found: {}", period);
            }
            info!(
                period = %period,
                relinked = ?outcome.relinked_period,
                new_current = ?outcome.new_current,
                "Period deleted"
            );
        }
        Command::Ingest { file } => {
            let body = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let request: IngestRequest = serde_json::from_str(&body)
                .with_context(|| format!("Invalid article JSON in {}", file.display()))?;
            let article = ingest_article(&repos, Some(&event_bus), request).await?;
            println!("{}", serde_json::to_string_pretty(&article)?);
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
