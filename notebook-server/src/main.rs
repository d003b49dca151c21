//! notebook-server: course generation and persistence service
//!
//! Startup order: tracing, build identification, configuration, root
//! folder, database, collaborators, router.

use anyhow::Result;
use clap::Parser;
use notebook_common::config::{RootFolderInitializer, RootFolderResolver};
use notebook_common::db::init_database;
use notebook_server::collaborators::{LocalObjectStore, OpenRouterGenerator, TrustedUserAuthenticator};
use notebook_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "notebook-server", version, about = "Course generation and persistence service")]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Explicit TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address (host:port)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("notebook-server")
        .with_cli_override(args.root_folder)
        .with_config_path(args.config);
    let toml_config = resolver.load_toml();

    // RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(toml_config.log_level()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        "Starting notebook-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolver.resolve_with(&toml_config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path, toml_config.pool_size()?).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let generator = OpenRouterGenerator::new(
        toml_config.gateway_api_key(),
        toml_config.gateway.base_url.clone(),
    )?;
    if !generator.is_configured() {
        warn!("No AI gateway key configured; course generation will fail until one is set");
    }

    let state = AppState::new(
        pool.clone(),
        Arc::new(TrustedUserAuthenticator::new(pool)),
        Arc::new(LocalObjectStore::new(initializer.uploads_path())),
        Arc::new(generator),
    );
    let app = build_router(state);

    let bind_address = args.bind.unwrap_or_else(|| toml_config.bind_address());
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("notebook-server listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
