//! Calendar Trigger: derives `do_dailies`/`do_weeklies`/`do_monthlies`
//! from the previous hourly slot-0 mtime vs. the wall clock.

use chrono::{DateTime, Datelike, Local, TimeZone, Weekday};

/// Calendar-derived promotion flags for a single job evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarFlags {
    pub do_dailies: bool,
    pub do_weeklies: bool,
    pub do_monthlies: bool,
}

/// Compute promotion flags from the previous hourly slot-0 mtime and
/// the current time, both Unix timestamps in seconds.
///
/// `do_dailies` compares day-of-year only (not full date), matching
/// spec.md §4.5 literally; a slot-0 from exactly one year ago on the
/// same calendar day reads as "today" rather than "due", an edge case
/// inherited from the source system rather than introduced here.
#[must_use]
pub fn compute(slot0_epoch_secs: u64, now_epoch_secs: u64) -> CalendarFlags {
    let slot0 = to_local(slot0_epoch_secs);
    let now = to_local(now_epoch_secs);

    let do_dailies = slot0.ordinal() != now.ordinal();
    let do_monthlies = do_dailies && now.day() == 1;
    let do_weeklies = do_dailies && now.weekday() == Weekday::Sun;

    CalendarFlags {
        do_dailies,
        do_weeklies,
        do_monthlies,
    }
}

fn to_local(epoch_secs: u64) -> DateTime<Local> {
    let secs = i64::try_from(epoch_secs).unwrap_or(i64::MAX);
    Local
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| Local.timestamp_opt(0, 0).single().expect("epoch is representable"))
}
