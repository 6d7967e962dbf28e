//! mmd-dash - Marketing metrics dashboard server
//!
//! Startup order: tracing, build identification, configuration, database
//! (schema + optional sample data), then the HTTP server.

use anyhow::Result;
use clap::Parser;
use mmd_common::config::{CliOverrides, DashboardConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};

use mmd_dash::{build_router, AppState};

/// Command-line arguments for mmd-dash
#[derive(Parser, Debug)]
#[command(name = "mmd-dash")]
#[command(about = "Marketing metrics dashboard")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to <config dir>/mmd/config.toml)
    #[arg(short, long, env = "MMD_CONFIG")]
    config: Option<PathBuf>,

    /// Database connection string, e.g. sqlite://metrics.db [env: DATABASE_URL]
    #[arg(long)]
    database_url: Option<String>,

    /// Secret key for signing flash cookies [env: SECRET_KEY]
    #[arg(long)]
    secret_key: Option<String>,

    /// Port to listen on [env: PORT, default: 5000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind [env: HOST, default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Do not insert sample rows into an empty database
    #[arg(long)]
    no_seed: bool,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_file: args.config,
            secret_key: args.secret_key,
            database_url: args.database_url,
            port: args.port,
            host: args.host,
            no_seed: args.no_seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    info!(
        "Starting mmd-dash v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli: CliOverrides = Args::parse().into();
    let config = match DashboardConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    if config.secret_key_is_default {
        warn!("SECRET_KEY not set, using the development key");
    }

    let pool = match mmd_common::db::init_database(&config.database_url).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if config.seed_sample_data {
        mmd_dash::db::seed_if_empty(&pool).await?;
    }

    info!(
        "KPI assumptions: ltv={} churn_rate={} mrr_factor={}",
        config.assumptions.ltv, config.assumptions.churn_rate, config.assumptions.mrr_factor
    );

    let state = AppState::new(pool, config.assumptions, config.secret_key.clone());
    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("mmd-dash listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
