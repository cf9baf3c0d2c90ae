//! Schedule Gate: decides whether a (host, directory) job is due.

/// `now` and `slot0_mtime` are Unix timestamps in seconds.
#[must_use]
pub fn is_due(
    hourlies: u32,
    slot0_mtime: u64,
    now: u64,
    must_exceed_seconds: u64,
    force: bool,
    auto_time: bool,
) -> bool {
    if force || !auto_time {
        return true;
    }
    let hourlies = hourlies.max(1) as f64;
    let floor = ((24.0 / hourlies - 0.5) * 3600.0).max(0.0) as u64;
    let must_exceed = floor.max(must_exceed_seconds);
    let elapsed = now.saturating_sub(slot0_mtime);
    elapsed > must_exceed
}
