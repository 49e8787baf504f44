//! catmash-server - voting-based image ranking service
//!
//! Startup: config resolution, tracing, database initialization, optional
//! catalogue import, then the HTTP server until Ctrl+C / SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use catmash_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use catmash_common::db::init_database_with_timeout;
use catmash_server::services::importer;
use catmash_server::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for catmash-server
#[derive(Parser, Debug)]
#[command(name = "catmash-server")]
#[command(about = "Voting-based image ranking service")]
#[command(version)]
struct Args {
    /// Folder holding catmash.db
    #[arg(short, long, env = "CATMASH_ROOT")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: platform config location)
    #[arg(short, long, env = "CATMASH_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "CATMASH_PORT")]
    port: Option<u16>,

    /// Interface to bind (overrides config)
    #[arg(long, env = "CATMASH_BIND")]
    bind: Option<String>,

    /// Catalogue URL imported at startup (overrides config)
    #[arg(long, env = "CATMASH_IMPORT_URL")]
    import_url: Option<String>,

    /// Skip the startup catalogue import
    #[arg(long)]
    no_import: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level applies; source logged below
    let (config, config_source) = TomlConfig::load_or_default(args.config.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=debug", config.logging.level).into()
            }),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting CatMash server (catmash-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config_source.log();

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();
    info!("Root folder: {}", root_folder.display());

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    let pool = match init_database_with_timeout(&db_path, config.busy_timeout_ms).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };
    info!("✓ Database ready: {}", db_path.display());

    let import_url = args.import_url.or(config.import_url.clone());
    match import_url {
        Some(url) if !args.no_import => match importer::import_from_url(&pool, &url).await {
            Ok(summary) => info!(
                "✓ Catalogue import: {} fetched, {} created, {} skipped",
                summary.fetched, summary.created, summary.skipped
            ),
            Err(e) => warn!("Catalogue import from {} failed: {:#}", url, e),
        },
        Some(_) => info!("Catalogue import disabled by --no-import"),
        None => info!("No catalogue URL configured, skipping import"),
    }

    let app = build_router(AppState::new(pool));

    let bind = args.bind.unwrap_or(config.bind_address);
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("catmash-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
