use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use glsync_core::{Result, SyncError};

use crate::paths::SyncPaths;

/// How far back a first run starts. The platform keeps roughly three
/// years of activity; half a year of margin on top.
pub const DEFAULT_LOOKBACK: Duration = Duration::days(3 * 365 + 182);

/// Persists the single "last processed moment" of the sync.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    paths: SyncPaths,
}

impl CheckpointStore {
    pub fn new(paths: SyncPaths) -> Self {
        Self { paths }
    }

    /// Persisted checkpoint, or `now - DEFAULT_LOOKBACK` when none exists yet.
    pub fn get(&self) -> Result<OffsetDateTime> {
        Ok(self
            .load()?
            .unwrap_or_else(|| OffsetDateTime::now_utc() - DEFAULT_LOOKBACK))
    }

    /// Persisted checkpoint. Returns None if the file doesn't exist.
    pub fn load(&self) -> Result<Option<OffsetDateTime>> {
        let path = &self.paths.checkpoint_file;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| self.error(e.to_string()))?;
        let ts = OffsetDateTime::parse(content.trim(), &Rfc3339)
            .map_err(|e| self.error(format!("invalid timestamp {:?}: {e}", content.trim())))?;
        Ok(Some(ts))
    }

    /// Overwrite the checkpoint with `ts` in RFC 3339.
    pub fn set(&self, ts: OffsetDateTime) -> Result<()> {
        let text = ts
            .format(&Rfc3339)
            .map_err(|e| self.error(format!("cannot format {ts}: {e}")))?;
        crate::write_atomic(&self.paths.checkpoint_file, text.as_bytes())
            .map_err(|e| self.error(e.to_string()))?;
        tracing::trace!(checkpoint = %text, "checkpoint saved");
        Ok(())
    }

    fn error(&self, message: String) -> SyncError {
        SyncError::Checkpoint {
            path: self.paths.checkpoint_file.clone(),
            message,
        }
    }
}
