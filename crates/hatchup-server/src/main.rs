use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hatchup_infrastructure::AppConfig;
use hatchup_server::{build_router, build_state};

#[derive(Parser, Debug)]
#[command(name = "hatchup-server")]
#[command(about = "HatchUp - VC research assistant backend", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "HATCHUP_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!("[hatchup-server] Listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("[hatchup-server] Shutting down");
        })
        .await?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
