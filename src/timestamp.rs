//! Choosing the date recorded for a file's commit.

use std::fs::{self, Metadata};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::warn;

use crate::git::{GitBackend, is_new};

/// Both candidate timestamps for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub modified: DateTime<Local>,
    pub created: DateTime<Local>,
}

impl FileTimes {
    /// Creation time for new files, modification time for everything else.
    pub fn select(&self, is_new: bool) -> DateTime<Local> {
        if is_new { self.created } else { self.modified }
    }

    fn now() -> Self {
        let now = Local::now();
        Self {
            modified: now,
            created: now,
        }
    }
}

/// Best creation time the platform offers.
///
/// A true birth time where the filesystem records one, otherwise the Unix
/// inode change time. `None` when neither is available.
pub fn creation_time(meta: &Metadata) -> Option<SystemTime> {
    if let Ok(created) = meta.created() {
        return Some(created);
    }
    change_time(meta)
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> Option<SystemTime> {
    None
}

/// Read both timestamps, falling back to "now" so a bad stat never aborts a run.
pub fn read_file_times(path: &Path) -> FileTimes {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(
                "Could not read metadata for {}: {}; using current time",
                path.display(),
                e
            );
            return FileTimes::now();
        }
    };

    let modified = match meta.modified() {
        Ok(t) => DateTime::<Local>::from(t),
        Err(e) => {
            warn!(
                "No modification time for {}: {}; using current time",
                path.display(),
                e
            );
            return FileTimes::now();
        }
    };

    let created = creation_time(&meta)
        .map(DateTime::<Local>::from)
        .unwrap_or_else(Local::now);

    FileTimes { modified, created }
}

/// Resolve the commit date for `path`, asking git whether the file is new.
pub fn resolve_timestamp<G: GitBackend + ?Sized>(git: &G, path: &Path) -> DateTime<Local> {
    read_file_times(path).select(is_new(git, path))
}
