//! # MasForge Server
//!
//! HTTP and terminal front ends for the specification engine.

mod api;
mod chat;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::PersistedConfig;

#[derive(Parser, Clone)]
#[command(author, version, about = "MasForge - design multi-agent systems by conversation")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// LLM provider for this run (overrides the config file)
        #[arg(long)]
        provider: Option<String>,
        /// Model for this run (overrides the config file)
        #[arg(long)]
        model: Option<String>,
    },
    /// Converse in the terminal
    Chat {
        /// Replay oracle answers from a file (one JSON object per line)
        #[arg(short, long)]
        script: Option<PathBuf>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("masforge=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(provider: Option<String>, model: Option<String>) -> PersistedConfig {
    let mut config = PersistedConfig::load(&config::default_path()).await;
    config.merge(PersistedConfig {
        provider,
        model,
        ..Default::default()
    });
    config
}

async fn run_server(port: u16, config: PersistedConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::with_llm(&config, config::default_path())?);
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "MasForge server running");
    tracing::info!("Sessions:  /api/v1/sessions, /:id/messages, /:id/events");
    tracing::info!("Config:    /api/v1/config (GET, PATCH)");
    tracing::info!("Providers: /api/v1/providers, OpenAPI: /api/v1/openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_path(".masforge/.env");
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Serve {
            port,
            provider,
            model,
        }) => run_server(port, load_config(provider, model).await).await,
        Some(CliCommand::Chat {
            script,
            provider,
            model,
        }) => chat::run(script.as_deref(), &load_config(provider, model).await).await,
        None => run_server(8080, load_config(None, None).await).await,
    }
}
