#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use vidshare::{
    api::{self, AppState},
    config::{self, AppConfig},
    media::{HttpMediaHost, MediaUploader, NoMediaHost},
    store::Store,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve the Vidshare REST API.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH, help = "Path to the TOML config file")]
    config: PathBuf,
    #[arg(long = "host", value_name = "ADDR", help = "Override the listen address")]
    host: Option<String>,
    #[arg(short = 'p', long = "port", value_name = "PORT", help = "Override the listen port")]
    port: Option<u16>,
    #[arg(long = "database", value_name = "PATH", help = "Override the SQLite database path")]
    database: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut cfg: AppConfig) -> AppConfig {
        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(database) = self.database {
            cfg.database_path = database;
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidshare=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let base = config::load_app_config_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let cfg = cli.apply(base);

    let store = Store::open(&cfg.database_path).context("initializing database")?;
    info!(path = %cfg.database_path.display(), "database ready");

    let media: Arc<dyn MediaUploader> = match &cfg.media_host {
        Some(host) => {
            info!(endpoint = %host.endpoint, "forwarding uploads to media host");
            Arc::new(HttpMediaHost::new(host))
        }
        None => {
            warn!("no media host configured; video uploads will fail");
            Arc::new(NoMediaHost)
        }
    };

    let state = AppState::new(store, media, cfg.upload_dir.clone());
    let app = api::router(state, cfg.max_upload_bytes);

    let addr = SocketAddr::new(
        cfg.host
            .parse()
            .with_context(|| format!("parsing listen address {}", cfg.host))?,
        cfg.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("API server listening on http://{}{}", addr, api::API_PREFIX);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", err);
    }
}
