//! Property-based tests for marker parsing and sample aggregation
//!
//! Core properties covered:
//! 1. Marker parsers never panic on arbitrary log lines
//! 2. Timer and bracketed values round-trip through their line grammars
//! 3. Percentiles are observed samples and stay ordered
//! 4. Aggregation accounts for every iteration slot

use perfkpi::aggregate::statistics::{mean3, median, mode, percentile};
use perfkpi::aggregate::{aggregate, IterationRecords, IterationSample};
use perfkpi::kpi::LatencyKind;
use perfkpi::markers::{
    extract_bracketed_last_value, extract_delimited_timer, vitals_timer, LogSnapshot,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_marker_parsers_never_panic(line in ".{0,120}") {
        let _ = extract_delimited_timer(&line);
        let _ = extract_bracketed_last_value(&line);
        let snapshot = LogSnapshot::from_text(&line);
        let _ = vitals_timer(&snapshot, LatencyKind::Cool, "com.example.app");
    }

    #[test]
    fn prop_delimited_timer_reads_back(millis in 0u64..10_000_000, fraction in any::<bool>()) {
        let suffix = if fraction { ".0" } else { "" };
        let line = format!(
            "I/Vitals: performance:cool_app_launch_time key=com.example.app Timer={}{};TI=1",
            millis, suffix
        );
        prop_assert_eq!(extract_delimited_timer(&line), Some(millis));
    }

    #[test]
    fn prop_bracketed_value_is_thousandths(
        prefix in prop::collection::vec(0u32..1000, 0..4),
        thousandths in 0u64..1_000_000,
    ) {
        let mut fields: Vec<String> = prefix.iter().map(u32::to_string).collect();
        fields.push(thousandths.to_string());
        let line = format!("am_activity_launch_time: [{}]", fields.join(","));
        let value = extract_bracketed_last_value(&line).unwrap();
        prop_assert_eq!(value, thousandths as f64 / 1000.0);
        prop_assert_eq!(value.trunc() as u64, thousandths / 1000);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_percentile_is_observed_and_ordered(
        series in prop::collection::vec(0.001f64..60.0, 1..40),
    ) {
        let tp50 = percentile(&series, 50.0).unwrap();
        let tp90 = percentile(&series, 90.0).unwrap();
        prop_assert!(series.contains(&tp50));
        prop_assert!(series.contains(&tp90));
        prop_assert!(tp50 <= tp90);
    }

    #[test]
    fn prop_median_and_mean_within_range(
        series in prop::collection::vec(0.001f64..60.0, 1..40),
    ) {
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let med = median(&series).unwrap();
        prop_assert!(med >= min && med <= max);
        // Rounding to three decimals can move the mean by at most half a thousandth
        let mean = mean3(&series).unwrap();
        prop_assert!(mean >= min - 0.0005 && mean <= max + 0.0005);
        prop_assert!(series.contains(&mode(&series).unwrap()));
    }

    #[test]
    fn prop_aggregate_counts_every_slot(
        timers in prop::collection::vec(prop_oneof![Just(0.0f64), 0.1f64..10.0], 1..15),
    ) {
        let mut records = IterationRecords::new(timers.len());
        for (index, &timer) in timers.iter().enumerate() {
            records.record(index, IterationSample { timer, ..IterationSample::LOST });
        }

        let result = aggregate(&mut records);
        let lost = timers.iter().filter(|&&t| t == 0.0).count();
        prop_assert_eq!(result.loss_count, lost);
        if lost < timers.len() {
            prop_assert_eq!(result.iterations, timers.len());
            prop_assert_eq!(result.values_per_iteration.len(), timers.len() - lost);
            prop_assert!(result.tp50 > 0.0);
        } else {
            prop_assert!(result.is_not_available());
        }
        prop_assert!(records.samples().iter().all(|s| *s == IterationSample::LOST));
    }
}
