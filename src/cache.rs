//! Once-per-day refresh gate driven by the output file's modification date.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, info};

/// Whether the pipeline must run again for `path` today.
pub fn should_refetch(path: &Path) -> bool {
    should_refetch_on(path, Local::now().date_naive())
}

/// Like [`should_refetch`], comparing against an explicit local `today`.
///
/// Only the calendar date of the last modification counts: a file written
/// at 00:01 and one written at 23:59 on the same day are equally fresh.
pub fn should_refetch_on(path: &Path, today: NaiveDate) -> bool {
    let Some(modified) = last_modified_date(path) else {
        debug!(path = %path.display(), "No cached output, fetch required");
        return true;
    };

    if modified == today {
        info!(path = %path.display(), "Output was modified today, using the existing file");
        false
    } else {
        debug!(path = %path.display(), %modified, %today, "Cached output is stale");
        true
    }
}

/// Local calendar date of the last modification, if the file is readable.
pub fn last_modified_date(path: &Path) -> Option<NaiveDate> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).date_naive())
}
