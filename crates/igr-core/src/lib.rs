//! igr-core: shared state and configuration for the Instagram auto-reply relay
//!
//! Holds the operator-maintained thread registry, the seen-message set,
//! configuration loading and the core error type.

pub mod config;
pub mod error;
pub mod registry;
pub mod seen;

pub use config::{Config, InstagramConfig, PollConfig, TelegramConfig};
pub use error::{Error, Result};
pub use registry::{Registry, ThreadId};
pub use seen::SeenSet;
