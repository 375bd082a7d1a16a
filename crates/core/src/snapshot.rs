//! Snapshot naming
//!
//! Snapshots of every target share one directory. Each is named
//! `<subvolume-name>-<unix-timestamp>`, so the subvolume name partitions the
//! directory between targets and the suffix is the snapshot's age.

use crate::error::FatalError;

/// Name of the snapshot of `subvolume_name` taken at `timestamp`
pub fn snapshot_name(subvolume_name: &str, timestamp: i64) -> String {
    format!("{}-{}", subvolume_name, timestamp)
}

/// Timestamp of `entry` if it is a snapshot of `subvolume_name`
///
/// Returns `Ok(None)` for entries belonging to other subvolumes or not
/// shaped like snapshots at all. An entry with the right prefix and an
/// all-digit suffix that does not fit a timestamp is an error.
pub fn match_snapshot(subvolume_name: &str, entry: &str) -> Result<Option<i64>, FatalError> {
    let suffix = match entry
        .strip_prefix(subvolume_name)
        .and_then(|rest| rest.strip_prefix('-'))
    {
        Some(suffix) => suffix,
        None => return Ok(None),
    };

    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    suffix
        .parse::<i64>()
        .map(Some)
        .map_err(|_| FatalError::MalformedSnapshotName {
            name: entry.to_string(),
        })
}
