//! igr: Instagram DM auto-reply relay
//!
//! Usage:
//!   igr           - Start the poller and the Telegram webhook server
//!   igr --help    - Show help
//!   igr --version - Show version

use std::sync::Arc;
use std::time::Duration;

use igr_core::{Config, Registry, SeenSet};
use igr_instagram::{Credentials, DirectProvider, InstagramApi, Poller, SessionFile, SessionGuard};
use igr_telegram::TelegramBot;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Poller + webhook server
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("igr {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("igr - Instagram DM auto-reply relay controlled from Telegram");
    println!();
    println!("Usage:");
    println!("  igr           Start the poller and the webhook server");
    println!("  igr --help    Show this help message");
    println!("  igr --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  INSTAGRAM_USERNAME        Instagram account (required)");
    println!("  INSTAGRAM_PASSWORD        Instagram password (required)");
    println!("  TELEGRAM_BOT_TOKEN        Telegram bot token (required)");
    println!("  TELEGRAM_CHAT_ID          Operator Telegram user id (required)");
    println!("  WEBHOOK_URL               Public webhook URL");
    println!("  PORT                      Webhook server port (default: 5000)");
    println!("  SESSION_PATH              Session file (default: session.json)");
    println!("  POLL_INTERVAL_SECS        Pause between polls (default: 8)");
    println!("  REPLY_DELAY_SECS          Pause after each reply (default: 2)");
    println!("  RATE_LIMIT_COOLDOWN_SECS  Pause when rate limited (default: 300)");
    println!("  HTTP_TIMEOUT_SECS         Instagram request timeout (default: 30)");
    println!();
    println!("Settings may also be given in ./igr.toml; environment variables win.");
}

/// Start the poller and the webhook server, then wait for Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting igr for Instagram account {}", config.instagram.username);

    let registry = Registry::new();

    let provider: Arc<dyn DirectProvider> = Arc::new(
        InstagramApi::new(Duration::from_secs(config.instagram.http_timeout_secs))
            .map_err(|e| anyhow::anyhow!("Failed to create Instagram client: {}", e))?,
    );

    let guard = SessionGuard::new(
        Arc::clone(&provider),
        SessionFile::new(&config.instagram.session_path),
        Credentials::new(&config.instagram.username, &config.instagram.password),
        config.poll.rate_limit_cooldown(),
    );
    let poller = Poller::new(
        provider,
        guard,
        registry.clone(),
        SeenSet::new(),
        config.poll.clone(),
    );

    // Track running services for shutdown
    let mut service_handles = Vec::new();

    service_handles.push(tokio::spawn(poller.run()));
    tracing::info!("Instagram poller started");

    let bot = TelegramBot::new(
        &config.telegram.bot_token,
        registry,
        config.telegram.operator_id,
    );
    let webhook_url = config.telegram.webhook_url.clone();
    let port = config.telegram.port;

    service_handles.push(tokio::spawn(async move {
        if let Err(e) = bot.start(&webhook_url, port).await {
            tracing::error!("Telegram bot error: {}", e);
        }
    }));

    tracing::info!("igr initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
