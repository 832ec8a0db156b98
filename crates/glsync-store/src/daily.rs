use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use glsync_core::{Result, WorkUnit};

use crate::paths::SyncPaths;

/// `"<YYYY-MM-DD HH:MM:SS ±HH:MM>: <message>"` with the timestamp shown in
/// `offset`.
pub fn format_record_line(ts: OffsetDateTime, offset: UtcOffset, message: &str) -> String {
    let fmt = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
    );
    let local = ts.to_offset(offset);
    let stamp = local.format(&fmt).unwrap_or_else(|_| local.to_string());
    format!("{stamp}: {message}")
}

/// Append one line for `unit` to the record file of its local calendar day,
/// creating the file on first use. Returns the file written.
pub fn append_record(paths: &SyncPaths, offset: UtcOffset, unit: &WorkUnit) -> Result<PathBuf> {
    let path = paths.daily_file(unit.occurred_at.to_offset(offset).date());
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    let line = format_record_line(unit.occurred_at, offset, &unit.message);
    writeln!(file, "{line}")?;
    Ok(path)
}
