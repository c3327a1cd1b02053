//! Scripted in-memory provider for guard and poller tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use igr_core::ThreadId;

use crate::error::{InstagramError, Result};
use crate::provider::{DirectMessage, DirectProvider};
use crate::session::{DeviceIds, SessionState};

/// Canned outcome for the next login or liveness call
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    LoginRequired,
    RateLimited,
    Fail,
}

impl Scripted {
    fn into_error(self) -> InstagramError {
        match self {
            Scripted::LoginRequired => InstagramError::LoginRequired,
            Scripted::RateLimited => {
                InstagramError::RateLimited("Please wait a few minutes".to_string())
            }
            Scripted::Fail => InstagramError::Api("scripted failure".to_string()),
        }
    }
}

pub fn session_for(user_id: &str) -> SessionState {
    SessionState {
        username: "shop.account".to_string(),
        user_id: user_id.to_string(),
        authorization: "Bearer IGT:2:test".to_string(),
        device: DeviceIds::generate(),
        user_agent: "test".to_string(),
        logged_in_at: Utc::now(),
    }
}

pub fn message(id: &str, user_id: &str, text: &str) -> DirectMessage {
    DirectMessage {
        id: id.to_string(),
        user_id: user_id.to_string(),
        text: Some(text.to_string()),
        item_type: "text".to_string(),
        timestamp: None,
    }
}

#[derive(Default)]
struct State {
    user_id: String,
    logins: VecDeque<Scripted>,
    checks: VecDeque<Scripted>,
    threads: HashMap<ThreadId, Vec<DirectMessage>>,
    failing_sends: Vec<ThreadId>,
    login_count: usize,
    check_count: usize,
    fetched: Vec<ThreadId>,
    sent: Vec<(ThreadId, String)>,
}

/// Provider whose responses are set up by the test.
///
/// Threads not added with [`ScriptedProvider::set_thread`] answer with
/// `ThreadNotFound`.
pub struct ScriptedProvider {
    state: Mutex<State>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                user_id: "self-id".to_string(),
                ..Default::default()
            }),
        }
    }

    /// Account id returned by subsequent logins
    pub fn with_user_id(self, user_id: &str) -> Self {
        self.set_user_id(user_id);
        self
    }

    pub fn set_user_id(&self, user_id: &str) {
        self.state.lock().unwrap().user_id = user_id.to_string();
    }

    pub fn push_login(&self, outcome: Scripted) {
        self.state.lock().unwrap().logins.push_back(outcome);
    }

    pub fn push_check(&self, outcome: Scripted) {
        self.state.lock().unwrap().checks.push_back(outcome);
    }

    pub fn set_thread(&self, thread_id: &str, messages: Vec<DirectMessage>) {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(ThreadId::new(thread_id), messages);
    }

    pub fn remove_thread(&self, thread_id: &str) {
        self.state
            .lock()
            .unwrap()
            .threads
            .remove(&ThreadId::new(thread_id));
    }

    pub fn fail_sends_to(&self, thread_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_sends
            .push(ThreadId::new(thread_id));
    }

    pub fn allow_sends_to(&self, thread_id: &str) {
        let thread_id = ThreadId::new(thread_id);
        self.state
            .lock()
            .unwrap()
            .failing_sends
            .retain(|t| *t != thread_id);
    }

    pub fn login_count(&self) -> usize {
        self.state.lock().unwrap().login_count
    }

    pub fn check_count(&self) -> usize {
        self.state.lock().unwrap().check_count
    }

    pub fn fetched(&self) -> Vec<ThreadId> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn sent(&self) -> Vec<(ThreadId, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl DirectProvider for ScriptedProvider {
    async fn login(&self, _username: &str, _password: &str) -> Result<SessionState> {
        let mut state = self.state.lock().unwrap();
        state.login_count += 1;
        match state.logins.pop_front() {
            Some(outcome) => Err(outcome.into_error()),
            None => Ok(session_for(&state.user_id)),
        }
    }

    async fn check_session(&self, _session: &SessionState) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_count += 1;
        match state.checks.pop_front() {
            Some(outcome) => Err(outcome.into_error()),
            None => Ok(()),
        }
    }

    async fn thread_messages(
        &self,
        _session: &SessionState,
        thread_id: &ThreadId,
    ) -> Result<Vec<DirectMessage>> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(thread_id.clone());
        state
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| InstagramError::ThreadNotFound(thread_id.to_string()))
    }

    async fn send_text(&self, _session: &SessionState, thread_id: &ThreadId, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_sends.contains(thread_id) {
            return Err(InstagramError::Api("send failed".to_string()));
        }
        state.sent.push((thread_id.clone(), text.to_string()));
        Ok(())
    }
}
