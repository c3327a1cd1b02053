//! Poll loop: replies to new messages in every registered thread
//!
//! Each cycle refreshes the session, snapshots the registry, and walks the
//! threads one by one. A failing thread never aborts the cycle.

use std::sync::Arc;

use tracing::{debug, error, info};

use igr_core::{PollConfig, Registry, SeenSet, ThreadId};

use crate::error::Result;
use crate::guard::{SessionGuard, SessionStatus};
use crate::provider::DirectProvider;
use crate::session::SessionState;

/// Characters of an incoming message included in log lines
const LOG_PREVIEW_CHARS: usize = 50;

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// Skipped after a rate-limit cooldown
    Backoff,
    /// Skipped because no session could be established
    SessionFailed,
}

/// Summary of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub threads_polled: usize,
    pub threads_failed: usize,
    pub replies_sent: usize,
}

impl CycleReport {
    fn new(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            threads_polled: 0,
            threads_failed: 0,
            replies_sent: 0,
        }
    }
}

/// Background poller for registered Instagram threads
pub struct Poller {
    provider: Arc<dyn DirectProvider>,
    guard: SessionGuard,
    registry: Registry,
    seen: SeenSet,
    config: PollConfig,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn DirectProvider>,
        guard: SessionGuard,
        registry: Registry,
        seen: SeenSet,
        config: PollConfig,
    ) -> Self {
        Self {
            provider,
            guard,
            registry,
            seen,
            config,
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Poll forever, pausing the configured interval between cycles
    pub async fn run(mut self) {
        info!(
            "Starting Instagram poller (interval: {}s, reply delay: {}s)",
            self.config.interval_secs, self.config.reply_delay_secs
        );

        loop {
            let report = self.run_cycle().await;
            debug!(
                "Cycle {:?}: {} threads polled, {} failed, {} replies",
                report.outcome, report.threads_polled, report.threads_failed, report.replies_sent
            );

            tokio::time::sleep(self.config.interval()).await;
        }
    }

    /// Run a single poll cycle
    pub async fn run_cycle(&mut self) -> CycleReport {
        let session = match self.guard.ensure_session().await {
            Ok(SessionStatus::Ready(session)) => session,
            Ok(SessionStatus::Backoff) => return CycleReport::new(CycleOutcome::Backoff),
            Err(e) => {
                error!("Monitor error: {}", e);
                return CycleReport::new(CycleOutcome::SessionFailed);
            }
        };

        let mut report = CycleReport::new(CycleOutcome::Completed);

        for (thread_id, reply) in self.registry.snapshot().await {
            match self.process_thread(&session, &thread_id, &reply).await {
                Ok(sent) => {
                    report.threads_polled += 1;
                    report.replies_sent += sent;
                }
                Err(e) => {
                    error!("Thread {} error: {}", thread_id, e);
                    report.threads_failed += 1;
                }
            }
        }

        report
    }

    /// Reply to every unseen message of one thread. Returns replies sent.
    async fn process_thread(
        &self,
        session: &SessionState,
        thread_id: &ThreadId,
        reply: &str,
    ) -> Result<usize> {
        let messages = self.provider.thread_messages(session, thread_id).await?;
        let mut sent = 0;

        for message in messages {
            if message.user_id == session.user_id {
                continue;
            }
            // Marked before sending: a failed send is not retried, and it
            // ends this thread for the cycle
            if !self.seen.mark(&message.id) {
                continue;
            }

            info!(
                "New msg in {}: {}",
                thread_id,
                message.preview(LOG_PREVIEW_CHARS)
            );
            if let Some(sent_at) = message.timestamp {
                debug!("Message {} from {} sent at {}", message.id, message.user_id, sent_at);
            }
            self.provider.send_text(session, thread_id, reply).await?;
            info!("Replied: {}", reply);
            sent += 1;

            tokio::time::sleep(self.config.reply_delay()).await;
        }

        Ok(sent)
    }
}
