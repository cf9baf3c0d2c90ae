//! Destination Selector: picks the target volume for a (host,
//! directory) job, either a fixed path or the least-recently-used
//! candidate from a list.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Result, SnapbackError};

use super::job::DestinationPolicy;

/// Select the destination root for a job, given the hourly slot-0
/// directory name used to probe each candidate's freshness.
///
/// # Errors
///
/// Returns `MissingDestination` if the policy resolves to nothing.
pub fn select(
    host: &str,
    directory: &str,
    hourly_dir: &str,
    policy: &DestinationPolicy,
) -> Result<PathBuf> {
    match policy {
        DestinationPolicy::Fixed(path) => {
            if path.as_os_str().is_empty() {
                return Err(SnapbackError::MissingDestination {
                    host: host.to_string(),
                    directory: directory.to_string(),
                });
            }
            Ok(path.clone())
        }
        DestinationPolicy::Lru(candidates) => {
            if candidates.is_empty() {
                return Err(SnapbackError::MissingDestination {
                    host: host.to_string(),
                    directory: directory.to_string(),
                });
            }
            let relative_directory = directory.trim_start_matches(['/', '\\']);
            let mut best: Option<(usize, SystemTime)> = None;
            for (idx, candidate) in candidates.iter().enumerate() {
                let probe = candidate
                    .join(host)
                    .join(relative_directory)
                    .join(format!("{hourly_dir}.0"));
                let mtime = slot_mtime(&probe);
                match best {
                    Some((_, best_mtime)) if mtime >= best_mtime => {}
                    _ => best = Some((idx, mtime)),
                }
            }
            let idx = best.map(|(idx, _)| idx).unwrap_or(0);
            Ok(candidates[idx].clone())
        }
    }
}

/// Modification time of a slot directory, treating missing/unstatable
/// paths as the Unix epoch so empty destinations always win ties.
#[must_use]
pub fn slot_mtime(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
