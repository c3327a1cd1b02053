//! The messaging provider boundary consumed by the session guard and poller

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use igr_core::ThreadId;

use crate::error::Result;
use crate::session::SessionState;

/// One item of a direct thread, in the order the provider returned it
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub id: String,
    /// Author account id
    pub user_id: String,
    pub text: Option<String>,
    pub item_type: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DirectMessage {
    /// First `max_chars` characters of the text for logging, or the item
    /// type in brackets for items without text
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.as_deref() {
            Some(text) => text.chars().take(max_chars).collect(),
            None => format!("[{}]", self.item_type),
        }
    }
}

/// Operations the relay needs from an Instagram direct-message backend.
///
/// Errors are expected to surface `InstagramError::LoginRequired` and
/// `InstagramError::RateLimited` where the backend signals them.
#[async_trait]
pub trait DirectProvider: Send + Sync {
    /// Full login with account credentials
    async fn login(&self, username: &str, password: &str) -> Result<SessionState>;

    /// Cheap liveness check of an existing session
    async fn check_session(&self, session: &SessionState) -> Result<()>;

    /// Messages of one thread
    async fn thread_messages(
        &self,
        session: &SessionState,
        thread_id: &ThreadId,
    ) -> Result<Vec<DirectMessage>>;

    /// Send a text message to a thread
    async fn send_text(&self, session: &SessionState, thread_id: &ThreadId, text: &str)
    -> Result<()>;
}
