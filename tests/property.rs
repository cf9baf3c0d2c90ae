//! Property-based tests for the pure decision functions in the
//! Snapshot Engine: the schedule gate threshold formula, the ring
//! rotator's slot-prefix invariant, and the calendar trigger's
//! weekly/monthly-imply-daily relationship.

use proptest::prelude::*;
use snapback::command::SystemCommandRunner;
use snapback::engine::{calendar, ring, schedule};
use tempfile::tempdir;

fn rm_cmd() -> Vec<String> {
    vec!["rm".to_string(), "-rf".to_string()]
}

fn mv_cmd() -> Vec<String> {
    vec!["mv".to_string()]
}

proptest! {
    /// `is_due` must always proceed once elapsed time exceeds
    /// `max(floor, must_exceed)`, and always skip when it's below that
    /// threshold, for any hourlies/must-exceed/elapsed combination with
    /// `force` and `auto_time` both honoring their short-circuits.
    #[test]
    fn schedule_gate_threshold_is_consistent(
        hourlies in 1u32..48,
        must_exceed_seconds in 0u64..100_000,
        elapsed in 0u64..200_000,
        now in 1_700_000_000u64..1_800_000_000u64,
    ) {
        let slot0 = now.saturating_sub(elapsed);
        let due = schedule::is_due(hourlies, slot0, now, must_exceed_seconds, false, true);

        let floor = (((24.0 / f64::from(hourlies.max(1)) - 0.5) * 3600.0).max(0.0)) as u64;
        let threshold = floor.max(must_exceed_seconds);
        let actual_elapsed = now.saturating_sub(slot0);

        prop_assert_eq!(due, actual_elapsed > threshold);
    }

    /// `force` always proceeds regardless of any other input.
    #[test]
    fn force_always_wins(
        hourlies in 1u32..48,
        must_exceed_seconds in 0u64..100_000,
        slot0 in 0u64..1_800_000_000u64,
        now in 0u64..1_800_000_000u64,
        auto_time in any::<bool>(),
    ) {
        prop_assert!(schedule::is_due(hourlies, slot0, now, must_exceed_seconds, true, auto_time));
    }

    /// `auto_time = false` always proceeds regardless of elapsed time.
    #[test]
    fn auto_time_off_always_wins(
        hourlies in 1u32..48,
        must_exceed_seconds in 0u64..100_000,
        slot0 in 0u64..1_800_000_000u64,
        now in 0u64..1_800_000_000u64,
    ) {
        prop_assert!(schedule::is_due(hourlies, slot0, now, must_exceed_seconds, false, false));
    }

    /// Starting from a contiguously occupied run of slots (the shape the
    /// engine always produces, since each run either clones into the
    /// next slot or leaves it untouched), rotating must preserve
    /// contiguity: the surviving occupied slots are still a single
    /// unbroken run, never a block with a gap followed by more
    /// occupied slots.
    #[test]
    fn rotation_preserves_contiguous_run(
        max in 2u32..8,
        rotate_all in any::<bool>(),
        occupied_count in 0u32..8,
    ) {
        let tmp = tempdir().unwrap();
        let base = tmp.path().join("hourly");

        let smallest = if rotate_all { 0 } else { 1 };
        let span = max - smallest;
        let occupied_count = occupied_count.min(span);

        for offset in 0..occupied_count {
            let dir = ring::slot_path(&base, smallest + offset);
            std::fs::create_dir_all(&dir).unwrap();
        }

        let runner = SystemCommandRunner;
        ring::rotate(&runner, &rm_cmd(), &mv_cmd(), &base, max, rotate_all).unwrap();

        let mut seen_gap = false;
        for n in smallest..max {
            let exists = ring::slot_path(&base, n).exists();
            if !exists {
                seen_gap = true;
            } else if seen_gap {
                prop_assert!(false, "slot {} occupied after a gap following rotation", n);
            }
        }
    }

    /// `do_weeklies` and `do_monthlies` never fire without `do_dailies`
    /// also firing, for any slot-0/now pair.
    #[test]
    fn weekly_and_monthly_imply_daily(
        slot0 in 0u64..2_000_000_000u64,
        now in 0u64..2_000_000_000u64,
    ) {
        let flags = calendar::compute(slot0, now);
        if flags.do_weeklies {
            prop_assert!(flags.do_dailies);
        }
        if flags.do_monthlies {
            prop_assert!(flags.do_dailies);
        }
    }
}
