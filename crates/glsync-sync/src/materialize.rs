use time::OffsetDateTime;

use glsync_core::{LocalZone, Result, WorkUnit};
use glsync_store::{append_record, CheckpointStore, SyncPaths};

use crate::vcs::VersionControl;

/// Prefix marking commits created by the sync.
pub const COMMIT_PREFIX: &str = "[sync]";

/// Writes work units to the target directory and owns the checkpoint.
///
/// The checkpoint is loaded once at construction and only ever moves
/// forward afterwards; every update goes through one private `advance`.
/// Units at or before the checkpoint the run started from were recorded by
/// an earlier run and are skipped.
pub struct Materializer<'a> {
    paths: SyncPaths,
    store: CheckpointStore,
    vcs: &'a dyn VersionControl,
    zone: LocalZone,
    checkpoint: OffsetDateTime,
    resumed_from: OffsetDateTime,
}

impl<'a> Materializer<'a> {
    pub fn new(
        paths: SyncPaths,
        vcs: &'a dyn VersionControl,
        zone: impl Into<LocalZone>,
    ) -> Result<Self> {
        let store = CheckpointStore::new(paths.clone());
        let checkpoint = store.get()?;
        Ok(Self {
            paths,
            store,
            vcs,
            zone: zone.into(),
            checkpoint,
            resumed_from: checkpoint,
        })
    }

    /// Latest fully processed moment.
    pub fn checkpoint(&self) -> OffsetDateTime {
        self.checkpoint
    }

    /// Checkpoint value loaded at construction.
    pub fn resumed_from(&self) -> OffsetDateTime {
        self.resumed_from
    }

    /// Append the unit's record line, advance the checkpoint, then commit.
    ///
    /// Returns `false` without touching the tree when the unit is covered by
    /// the starting checkpoint. The checkpoint is persisted before the
    /// commit is attempted so a failed commit never causes the unit to be
    /// recorded again.
    pub fn materialize(&mut self, unit: &WorkUnit) -> Result<bool> {
        if unit.occurred_at <= self.resumed_from {
            tracing::debug!(at = %unit.occurred_at, unit = %unit.message, "already recorded");
            return Ok(false);
        }
        let offset = self.zone.offset_at(unit.occurred_at);
        let file = append_record(&self.paths, offset, unit)?;
        self.advance(unit.occurred_at)?;
        self.vcs
            .commit_all(&format!("{COMMIT_PREFIX} {}", unit.message), unit.occurred_at)?;
        tracing::info!(
            at = %unit.occurred_at,
            unit = %unit.message,
            file = %file.display(),
            "recorded"
        );
        Ok(true)
    }

    /// Mark an event as fully processed once all of its units are written.
    ///
    /// Commits of a push can be authored well before the push itself, so
    /// per-unit advances alone may leave the checkpoint behind the event.
    pub fn complete_event(&mut self, created_at: OffsetDateTime) -> Result<()> {
        self.advance(created_at)
    }

    fn advance(&mut self, ts: OffsetDateTime) -> Result<()> {
        if ts <= self.checkpoint {
            return Ok(());
        }
        self.store.set(ts)?;
        self.checkpoint = ts;
        Ok(())
    }
}
