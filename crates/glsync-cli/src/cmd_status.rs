use std::path::Path;

use anyhow::Context;
use time::UtcOffset;

use glsync_store::{CheckpointStore, SyncPaths, DEFAULT_LOOKBACK};

pub fn execute(target: &Path, local_offset: UtcOffset) -> anyhow::Result<()> {
    let paths = SyncPaths::discover(target);
    if !paths.root.is_dir() {
        anyhow::bail!("target directory does not exist: {}", target.display());
    }
    let store = CheckpointStore::new(paths.clone());

    println!("Target: {}", paths.root.display());
    match store.load()? {
        Some(ts) => println!("Checkpoint: {}", ts.to_offset(local_offset)),
        None => println!(
            "Checkpoint: (none, first sync looks back {} days)",
            DEFAULT_LOOKBACK.whole_days()
        ),
    }

    let days = paths
        .daily_files()
        .with_context(|| format!("listing {}", paths.root.display()))?;
    match days.last().and_then(|p| p.file_stem()) {
        Some(latest) => println!(
            "Recorded days: {} (latest {})",
            days.len(),
            latest.to_string_lossy()
        ),
        None => println!("Recorded days: 0"),
    }
    Ok(())
}
