//! Telegram bot implementation

use std::sync::Arc;

use teloxide::Bot;
use teloxide::requests::Requester;
use tracing::{error, info, warn};

use igr_core::Registry;

use crate::commands::CommandHandler;
use crate::error::{Result, TelegramError};
use crate::webhook::{WebhookState, start_webhook_server};

/// Telegram bot wrapper
pub struct TelegramBot {
    bot: Bot,
    handler: CommandHandler,
}

impl TelegramBot {
    /// Create a new Telegram bot operating on `registry`
    pub fn new(token: &str, registry: Registry, operator_id: u64) -> Self {
        Self {
            bot: Bot::new(token),
            handler: CommandHandler::new(registry, operator_id),
        }
    }

    /// Point Telegram at our webhook URL.
    ///
    /// Failure is logged; the server still starts so a later manual
    /// `setWebhook` can recover.
    pub async fn register_webhook(&self, webhook_url: &str) {
        let url = match reqwest::Url::parse(webhook_url) {
            Ok(url) => url,
            Err(e) => {
                error!("Webhook failed: invalid URL {}: {}", webhook_url, e);
                return;
            }
        };

        match self.bot.set_webhook(url).await {
            Ok(_) => info!("Webhook set to {}", webhook_url),
            Err(e) => error!("Webhook failed: {}", TelegramError::from(e)),
        }
    }

    /// Look up our own username so `/cmd@username` parses
    async fn username(&self) -> String {
        match self.bot.get_me().await {
            Ok(me) => me.user.username.clone().unwrap_or_default(),
            Err(e) => {
                warn!("Failed to fetch bot info: {}", TelegramError::from(e));
                String::new()
            }
        }
    }

    /// Register the webhook and serve updates until the server stops
    pub async fn start(self, webhook_url: &str, port: u16) -> Result<()> {
        info!("Starting Telegram bot...");

        self.register_webhook(webhook_url).await;
        let bot_username = self.username().await;

        let state = WebhookState {
            handler: self.handler,
            sender: Arc::new(self.bot),
            bot_username,
        };

        start_webhook_server(state, port).await
    }
}
