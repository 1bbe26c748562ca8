//! Archivum catalog server binary — thin CLI shell over the
//! [`archivum_server`] library crate.

use std::path::PathBuf;

use archivum_server::api::{self, AppState};
use archivum_server::config::ServerConfig;
use archivum_server::ingest::SourceLocks;
use archivum_server::store;
use clap::{CommandFactory, Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Archivum catalog server — ingest, deduplication, and the query/control API.
#[derive(Parser)]
#[command(name = "archivum-server", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    bind_host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    bind_port: Option<u16>,

    /// Override the database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down...");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("archivum_server=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "archivum-server", &mut std::io::stdout());
        return;
    }

    let mut config = ServerConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: invalid configuration: {e}");
        std::process::exit(1);
    });
    if let Some(host) = cli.bind_host {
        config.bind_host = host;
    }
    if let Some(port) = cli.bind_port {
        config.bind_port = port;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: could not connect to {}: {e}", config.database_url);
            std::process::exit(1);
        });

    store::run_migrations(&pool).await.unwrap_or_else(|e| {
        eprintln!("Error: migration failed: {e}");
        std::process::exit(1);
    });

    let state = AppState {
        pool,
        locks: SourceLocks::new(),
    };

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let bind_addr = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap_or_else(|e| {
        eprintln!("Error: could not bind to {bind_addr}: {e}");
        std::process::exit(1);
    });

    info!(addr = %bind_addr, "archivum-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: server error: {e}");
            std::process::exit(1);
        });
}
