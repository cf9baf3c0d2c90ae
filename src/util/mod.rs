//! Small shared helpers that don't warrant their own module: time
//! conversions, host-name resolution, and trigger-filename validation.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, saturating to `0` for times before it
/// (used so a missing slot's mtime reads as "never").
#[must_use]
pub fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Resolve the local host name used for reporting: the `MyHost` config
/// override if set, else the OS hostname, else `"localhost"`. Per
/// spec.md §9, this has no semantic effect on scheduling or retention,
/// only on log/transcript text.
#[must_use]
pub fn resolve_my_host(configured: Option<&str>) -> String {
    if let Some(h) = configured {
        return h.to_string();
    }
    hostname::get()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// `true` if every character in `name` is alphanumeric, `_`, or `-`, and
/// the name is non-empty. The launch loop uses this to reject trigger
/// filenames that could not have been produced by a legitimate caller.
#[must_use]
pub fn is_safe_trigger_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_seconds_epoch_is_zero() {
        assert_eq!(unix_seconds(UNIX_EPOCH), 0);
    }

    #[test]
    fn unix_seconds_before_epoch_saturates_to_zero() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(10);
        assert_eq!(unix_seconds(before), 0);
    }

    #[test]
    fn resolve_my_host_prefers_configured_value() {
        assert_eq!(
            resolve_my_host(Some("backup-host.example.com")),
            "backup-host.example.com"
        );
    }

    #[test]
    fn resolve_my_host_falls_back_to_os_hostname() {
        let resolved = resolve_my_host(None);
        assert!(!resolved.is_empty());
    }

    #[test]
    fn trigger_name_validation() {
        assert!(is_safe_trigger_name("web01"));
        assert!(is_safe_trigger_name("web01_prod-east"));
        assert!(!is_safe_trigger_name(""));
        assert!(!is_safe_trigger_name("evil; rm -rf /"));
        assert!(!is_safe_trigger_name("../etc/passwd"));
        assert!(!is_safe_trigger_name("web01 "));
    }
}
