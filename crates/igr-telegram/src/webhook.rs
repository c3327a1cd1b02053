//! Webhook server for the Telegram bot
//!
//! Telegram POSTs every update to `/webhook`. The reply is always `200 OK`;
//! anything that goes wrong while handling the update is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use teloxide::Bot;
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, ParseMode, Update, UpdateKind};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

use crate::commands::{Command, CommandHandler};
use crate::error::{Result, TelegramError};

/// Delivers command replies back to the chat they came from
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, chat_id: ChatId, html: &str) -> Result<()>;
}

#[async_trait]
impl ReplySender for Bot {
    async fn send_reply(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.send_message(chat_id, html)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub handler: CommandHandler,
    pub sender: Arc<dyn ReplySender>,
    /// Used to accept `/command@username` forms
    pub bot_username: String,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

async fn health() -> &'static str {
    "OK"
}

/// Handle incoming webhook
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if let Err(e) = dispatch_update(&state, &update).await {
                error!("Error handling update {:?}: {}", update.id, e);
            }
        }
        Err(e) => {
            error!("Failed to parse update: {}", e);
        }
    }

    (StatusCode::OK, "OK")
}

/// Route one update to the command handler and send its reply
pub async fn dispatch_update(state: &WebhookState, update: &Update) -> Result<()> {
    let UpdateKind::Message(message) = &update.kind else {
        debug!("Ignoring non-message update {:?}", update.id);
        return Ok(());
    };
    let (Some(user), Some(text)) = (update.from(), message.text()) else {
        return Ok(());
    };

    let command = match Command::parse(text, &state.bot_username) {
        Ok(command) => command,
        Err(e) => {
            debug!("Not a command ({}): {}", e, text);
            return Ok(());
        }
    };

    let Some(reply) = state.handler.handle(user.id.0, command).await else {
        return Ok(());
    };

    info!("Replying to command from {} in chat {}", user.id, message.chat.id);
    state.sender.send_reply(message.chat.id, &reply).await
}

/// Start webhook server
pub async fn start_webhook_server(state: WebhookState, port: u16) -> Result<()> {
    let app = create_webhook_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TelegramError::Webhook(e.to_string()))?;

    info!("Telegram webhook server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| TelegramError::Webhook(e.to_string()))?;

    Ok(())
}
