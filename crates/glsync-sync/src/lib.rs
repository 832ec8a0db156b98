pub mod engine;
pub mod materialize;
pub mod vcs;

pub use engine::{SyncEngine, SyncReport};
pub use materialize::Materializer;
pub use vcs::{GitCli, RecordingVcs, VersionControl};
