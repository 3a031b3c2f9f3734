//! WhatsApp Chef server binary.
//!
//! Starts the local web server with the restaurant form, the generate action
//! and the chat preview.
//!
//! # Usage
//!
//! ```bash
//! # Default settings (127.0.0.1:3002, key from GEMINI_API_KEY or API_KEY)
//! GEMINI_API_KEY=... whatsapp-chef
//!
//! # Different port and a custom config file
//! whatsapp-chef --port 8080 --config ./chef.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whatsapp_chef::config::Config;
use whatsapp_chef::constants::{APP_BINARY_NAME, APP_NAME, MISSING_API_KEY_MESSAGE};
use whatsapp_chef::preview::{Clipboard, MemoryClipboard, SystemClipboard};
use whatsapp_chef::services::GeminiGenerator;
use whatsapp_chef::session::Session;
use whatsapp_chef::web;

/// WhatsApp Chef - WhatsApp ordering templates for small restaurants
#[derive(Parser, Debug)]
#[command(name = APP_BINARY_NAME, author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Config file path.
    /// Defaults to the platform-specific config directory:
    /// - Linux: ~/.config/WhatsAppChef/config.toml
    /// - macOS: ~/Library/Application Support/WhatsAppChef/config.toml
    /// - Windows: %APPDATA%\WhatsAppChef\config.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep copied text in memory instead of the system clipboard
    #[arg(long)]
    headless_clipboard: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    config.apply_env_overrides(|name| std::env::var(name).ok());

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!("{}", MISSING_API_KEY_MESSAGE);
    }

    let generator =
        GeminiGenerator::new(&config.generation).context("Failed to create Gemini client")?;
    info!("Using model {}", config.generation.model);

    let clipboard: Arc<dyn Clipboard> = if args.headless_clipboard {
        info!("Clipboard writes are kept in memory");
        Arc::new(MemoryClipboard::new())
    } else {
        Arc::new(SystemClipboard)
    };

    let session = Session::new(api_key, Arc::new(generator), clipboard);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("{} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    web::run_server(session, addr).await
}
