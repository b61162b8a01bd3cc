// Property suite for the interval computation: every interval is exactly
// later - earlier for its fixed pair, whatever the clocks did.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use syncmeter::latency::{render_duration, LatencyReport, LifecycleTimestamps, INTERVALS};

fn instant(offset_ms: i64) -> Option<DateTime<Utc>> {
    Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(offset_ms))
}

/// Stamps along the expected causal chain: binding, WDS create, manifest,
/// applied, WEC create, WEC status, work status, WDS status.
fn chained_stamps(gaps: [i64; 7]) -> LifecycleTimestamps {
    let mut offsets = [0i64; 8];
    for (i, gap) in gaps.iter().enumerate() {
        offsets[i + 1] = offsets[i] + gap;
    }
    LifecycleTimestamps {
        binding_create: instant(offsets[0]),
        wds_deploy_create: instant(offsets[1]),
        manifest_work_create: instant(offsets[2]),
        applied_manifest_create: instant(offsets[3]),
        wec_deploy_create: instant(offsets[4]),
        wec_deploy_status: instant(offsets[5]),
        work_status_update: instant(offsets[6]),
        wds_deploy_status: instant(offsets[7]),
    }
}

proptest! {
    /// Any set of instants: each computed interval equals the subtraction of
    /// its fixed pair, and the interval order matches the const table.
    #[test]
    fn intervals_are_exactly_their_fixed_pair(offsets in proptest::array::uniform8(-600_000i64..600_000)) {
        let stamps = LifecycleTimestamps {
            binding_create: instant(offsets[0]),
            wds_deploy_create: instant(offsets[1]),
            wds_deploy_status: instant(offsets[2]),
            manifest_work_create: instant(offsets[3]),
            applied_manifest_create: instant(offsets[4]),
            wec_deploy_create: instant(offsets[5]),
            wec_deploy_status: instant(offsets[6]),
            work_status_update: instant(offsets[7]),
        };
        let report = LatencyReport::compute(stamps);

        prop_assert_eq!(report.intervals.len(), INTERVALS.len());
        for (interval, spec) in report.intervals.iter().zip(INTERVALS.iter()) {
            prop_assert_eq!(interval.name, spec.name);
            let expected = stamps.get(spec.later).unwrap() - stamps.get(spec.earlier).unwrap();
            prop_assert_eq!(interval.value, Some(expected));
        }
    }

    /// Causally ordered runs never produce the invalid-order sentinel,
    /// except for the manifest-to-applied pair whose fixed orientation
    /// subtracts the later event (its sentinel is the documented signal).
    #[test]
    fn ordered_runs_render_numeric_durations(gaps in proptest::array::uniform7(0i64..600_000)) {
        let report = LatencyReport::compute(chained_stamps(gaps));

        for interval in &report.intervals {
            let value = interval.value.expect("all instants present");
            if interval.name == "Manifest→Applied MW" {
                prop_assert!(value <= TimeDelta::zero());
                continue;
            }
            prop_assert!(value >= TimeDelta::zero(), "interval {} was {:?}", interval.name, value);
            prop_assert!(!render_duration(interval.value).starts_with("N/A"));
        }
    }

    /// A status relayed after the origin recorded it renders the sentinel,
    /// never a raw negative or a spurious huge duration.
    #[test]
    fn skewed_status_clock_renders_sentinel(skew_ms in 1i64..600_000) {
        let mut stamps = chained_stamps([1_000; 7]);
        stamps.work_status_update = instant(7_000 + skew_ms);
        let report = LatencyReport::compute(stamps);

        let interval = report.interval("WEC status→WDS status").unwrap();
        prop_assert_eq!(interval.value, Some(TimeDelta::milliseconds(-skew_ms)));
        let rendered = render_duration(interval.value);
        prop_assert_eq!(rendered.as_str(), "N/A (invalid timestamp order)");
    }
}
