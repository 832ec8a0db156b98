pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
pub mod types;

pub use classify::{plan, reconstruct, Plan};
pub use config::{BackoffStrategy, LocalZone, RetrySettings, SyncConfig};
pub use error::{Result, SyncError};
pub use feed::{order_commit_range, ActivityFeed, ScriptedFeed};
pub use types::*;
