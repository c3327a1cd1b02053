//! igr-instagram: Instagram side of the auto-reply relay
//!
//! Talks to the Instagram private API, keeps the session alive across
//! restarts, and runs the poll loop that answers new direct messages in
//! every registered thread.

pub mod api;
pub mod error;
pub mod guard;
pub mod poller;
pub mod provider;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use api::InstagramApi;
pub use error::{InstagramError, Result};
pub use guard::{Credentials, SessionGuard, SessionStatus};
pub use poller::{CycleOutcome, CycleReport, Poller};
pub use provider::{DirectMessage, DirectProvider};
pub use session::{DeviceIds, SessionFile, SessionState};
