//! Telegram bot commands

use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{debug, info};

use igr_core::{Registry, ThreadId};

/// Telegram bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Instagram auto-reply commands")]
pub enum Command {
    #[command(description = "Show usage")]
    Start,
    #[command(description = "Auto-reply in a thread: /add <thread_id> <message>")]
    Add(String),
    #[command(description = "Stop auto-replying in a thread: /remove <thread_id>")]
    Remove(String),
    #[command(description = "List active threads")]
    List,
}

/// Executes commands against the shared registry on behalf of the operator
#[derive(Clone)]
pub struct CommandHandler {
    registry: Registry,
    operator_id: u64,
}

impl CommandHandler {
    pub fn new(registry: Registry, operator_id: u64) -> Self {
        Self {
            registry,
            operator_id,
        }
    }

    pub fn is_authorized(&self, user_id: u64) -> bool {
        user_id == self.operator_id
    }

    /// Run a command and return the HTML reply to send.
    ///
    /// Commands from anyone but the operator return `None` and change nothing.
    pub async fn handle(&self, user_id: u64, command: Command) -> Option<String> {
        if !self.is_authorized(user_id) {
            debug!("Ignoring {:?} from unauthorized user {}", command, user_id);
            return None;
        }

        let reply = match command {
            Command::Start => handle_start(),
            Command::Add(args) => self.handle_add(&args).await,
            Command::Remove(args) => self.handle_remove(&args).await,
            Command::List => self.handle_list().await,
        };

        Some(reply)
    }

    /// Handle /add
    async fn handle_add(&self, args: &str) -> String {
        let mut words = args.split_whitespace();
        let (Some(thread_id), Some(first)) = (words.next(), words.next()) else {
            return html::escape("Usage: /add <thread_id> <msg>");
        };

        let reply = std::iter::once(first)
            .chain(words)
            .collect::<Vec<_>>()
            .join(" ");

        let previous = self
            .registry
            .upsert(ThreadId::new(thread_id), reply.clone())
            .await;
        info!(
            "{} thread {} ({} active)",
            if previous.is_some() { "Updated" } else { "Added" },
            thread_id,
            self.registry.len().await
        );

        format!(
            "Added: {}\nReply: {}",
            html::code_inline(thread_id),
            html::code_inline(&reply)
        )
    }

    /// Handle /remove
    async fn handle_remove(&self, args: &str) -> String {
        let Some(thread_id) = args.split_whitespace().next() else {
            return html::escape("Usage: /remove <thread_id>");
        };

        if self.registry.remove(&ThreadId::new(thread_id)).await {
            info!("Removed thread {}", thread_id);
            format!("Removed: {}", html::code_inline(thread_id))
        } else {
            "Not active".to_string()
        }
    }

    /// Handle /list
    async fn handle_list(&self) -> String {
        let entries = self.registry.snapshot().await;
        if entries.is_empty() {
            return "No active threads".to_string();
        }

        let mut text = format!("{}\n", html::bold("Active Threads:"));
        for (thread_id, reply) in entries {
            text.push_str(&format!(
                "• {}: {}\n",
                html::code_inline(thread_id.as_str()),
                html::code_inline(&reply)
            ));
        }
        text
    }
}

/// Handle /start
fn handle_start() -> String {
    html::escape(
        "Instagram GC Auto-Reply Bot\n\n\
         /add <thread_id> <message>\n\
         /remove <thread_id>\n\
         /list",
    )
}
