use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::Date;

pub const CHECKPOINT_FILE: &str = "last-recorded-date.txt";

/// Well-known paths inside the sync target directory.
#[derive(Debug, Clone)]
pub struct SyncPaths {
    pub root: PathBuf,
    pub checkpoint_file: PathBuf,
}

impl SyncPaths {
    /// Derive all paths from the target directory. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            checkpoint_file: root.join(CHECKPOINT_FILE),
            root,
        }
    }

    /// Record file for one calendar day: `<root>/<YYYY-MM-DD>.txt`.
    pub fn daily_file(&self, date: Date) -> PathBuf {
        let fmt = format_description!("[year]-[month]-[day]");
        // A calendar date with four-digit year always formats.
        let name = date
            .format(&fmt)
            .unwrap_or_else(|_| date.to_string());
        self.root.join(format!("{name}.txt"))
    }

    /// Existing daily record files, sorted by name (and therefore by day).
    pub fn daily_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_daily_file_name(p))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn is_daily_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name.strip_suffix(".txt") else {
        return false;
    };
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(stem, &fmt).is_ok()
}
