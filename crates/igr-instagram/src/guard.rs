//! Session guard: makes sure an authenticated session exists before each poll

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{InstagramError, Result};
use crate::provider::DirectProvider;
use crate::session::{SessionFile, SessionState};

/// Account credentials used for full logins
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of [`SessionGuard::ensure_session`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Session is live and may be used for this cycle
    Ready(SessionState),
    /// The provider throttled us; the cooldown has already been waited out
    Backoff,
}

/// Owns the session and refreshes it on demand
pub struct SessionGuard {
    provider: Arc<dyn DirectProvider>,
    store: SessionFile,
    credentials: Credentials,
    cooldown: Duration,
    cached: Option<SessionState>,
}

impl SessionGuard {
    pub fn new(
        provider: Arc<dyn DirectProvider>,
        store: SessionFile,
        credentials: Credentials,
        cooldown: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            credentials,
            cooldown,
            cached: None,
        }
    }

    /// The session currently held in memory, if any
    pub fn current(&self) -> Option<&SessionState> {
        self.cached.as_ref()
    }

    /// Make sure a live session exists.
    ///
    /// Reuses the in-memory or persisted session after a liveness check,
    /// logs in again at most once when that session is rejected, and waits
    /// out the cooldown when the provider rate limits us.
    pub async fn ensure_session(&mut self) -> Result<SessionStatus> {
        let existing = match self.cached.take() {
            Some(session) => Some(session),
            None => self.load_persisted().await?,
        };

        let Some(session) = existing else {
            return self.login().await;
        };

        match self.provider.check_session(&session).await {
            Ok(()) => {
                debug!("Session for {} is live", session.username);
                self.cached = Some(session.clone());
                Ok(SessionStatus::Ready(session))
            }
            Err(InstagramError::LoginRequired) => {
                warn!("Session for {} was rejected, logging in again", session.username);
                self.store.remove().await?;
                self.login().await
            }
            Err(InstagramError::RateLimited(reason)) => {
                self.cached = Some(session);
                self.backoff(&reason).await
            }
            Err(e) => {
                self.cached = Some(session);
                Err(e)
            }
        }
    }

    /// Load the persisted session, discarding a file that no longer parses
    async fn load_persisted(&self) -> Result<Option<SessionState>> {
        match self.store.load().await {
            Ok(Some(session)) => {
                info!("Session loaded from {}", self.store.path().display());
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(InstagramError::Json(e)) => {
                warn!(
                    "Discarding unreadable session file {}: {}",
                    self.store.path().display(),
                    e
                );
                self.store.remove().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn login(&mut self) -> Result<SessionStatus> {
        let result = self
            .provider
            .login(&self.credentials.username, &self.credentials.password)
            .await;

        match result {
            Ok(session) => {
                if let Err(e) = self.store.save(&session).await {
                    warn!("Logged in but failed to save session: {}", e);
                } else {
                    info!("Logged in & session saved");
                }
                self.cached = Some(session.clone());
                Ok(SessionStatus::Ready(session))
            }
            Err(InstagramError::RateLimited(reason)) => self.backoff(&reason).await,
            Err(e) => {
                error!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    async fn backoff(&self, reason: &str) -> Result<SessionStatus> {
        warn!(
            "Rate limited ({}). Waiting {}s...",
            reason,
            self.cooldown.as_secs()
        );
        tokio::time::sleep(self.cooldown).await;
        Ok(SessionStatus::Backoff)
    }
}
