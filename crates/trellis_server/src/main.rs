//! Trellis server
//!
//! Serves the demo application over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trellis_session::{
    FileSystemSessionManager, FlushHandle, InMemorySessionManager, ServerConfig, SessionManager,
    SessionStore,
};

mod demo;
mod server;

use demo::DemoApp;
use server::TrellisServer;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stateful server-side web UI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo application
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { config, bind } => cmd_serve(config, bind),
        Commands::Config => cmd_config(),
    }
}

fn cmd_serve(config_path: Option<PathBuf>, bind: Option<SocketAddr>) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ServerConfig::development(),
    };
    if let Some(bind) = bind {
        config = config.with_bind(bind);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: ServerConfig) -> Result<()> {
    let (sessions, flushing) = open_sessions(&config)?;

    let app = DemoApp::new(config.blob_cache_capacity);
    let mut server = TrellisServer::new(config, sessions, app.page_requester())?;
    app.install_resources(&mut server);

    let bind = server.config().bind;
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let served = Arc::new(server).serve(listener, shutdown_signal()).await;

    if let Some(handle) = flushing {
        handle.stop();
    }
    info!("Stopped");
    served
}

fn open_sessions(
    config: &ServerConfig,
) -> Result<(Arc<dyn SessionManager>, Option<FlushHandle>)> {
    match config.session_store {
        SessionStore::Memory => Ok((Arc::new(InMemorySessionManager::new()), None)),
        SessionStore::File => {
            let manager = FileSystemSessionManager::open(&config.session_file).with_context(|| {
                format!("opening session map {}", config.session_file.display())
            })?;
            let handle = manager.start_flushing(config.flush_interval());
            Ok((Arc::new(manager), Some(handle)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

fn cmd_config() -> Result<()> {
    let text = toml::to_string_pretty(&ServerConfig::development())
        .context("writing the default configuration")?;
    print!("{text}");
    Ok(())
}
