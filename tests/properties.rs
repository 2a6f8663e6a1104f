//! Property tests for run segmentation and time-series preparation.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use proptest::prelude::*;
use wqdab::anomaly::{anomaly_runs, anomaly_windows};
use wqdab::data::{prepare_time_series, PrepareOptions, RawColumn, RawFrame};

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Sorted, possibly irregular, possibly repeating minute offsets.
fn index_strategy(max_len: usize) -> impl Strategy<Value = Vec<NaiveDateTime>> {
    prop::collection::vec(0i64..5, 1..max_len).prop_map(|steps| {
        let mut t = t0();
        steps
            .into_iter()
            .map(|s| {
                t += TimeDelta::minutes(s);
                t
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn runs_are_maximal_and_cover_every_flag(flags in prop::collection::vec(any::<bool>(), 0..200)) {
        let runs = anomaly_runs(&flags);
        let covered: usize = runs.iter().map(|r| r.end() - r.start() + 1).sum();
        prop_assert_eq!(covered, flags.iter().filter(|&&f| f).count());

        for run in &runs {
            prop_assert!(flags[run.clone()].iter().all(|&f| f));
            prop_assert!(*run.start() == 0 || !flags[run.start() - 1]);
            prop_assert!(run.end() + 1 == flags.len() || !flags[run.end() + 1]);
        }
        for pair in runs.windows(2) {
            prop_assert!(pair[0].end() + 1 < *pair[1].start());
        }
    }

    #[test]
    fn windows_are_clipped_and_contain_their_run(
        (index, flags) in index_strategy(150).prop_flat_map(|idx| {
            let n = idx.len();
            (Just(idx), prop::collection::vec(any::<bool>(), n))
        }),
        margin in 0i64..120,
    ) {
        let margin = TimeDelta::minutes(margin);
        let windows = anomaly_windows(&index, &flags, margin);
        prop_assert_eq!(windows.len(), anomaly_runs(&flags).len());

        let first = index[0];
        let last = index[index.len() - 1];
        for w in &windows {
            prop_assert!(w.window_start >= first);
            prop_assert!(w.window_end <= last);
            prop_assert!(w.window_start <= w.anomaly_start);
            prop_assert!(w.anomaly_start <= w.anomaly_end);
            prop_assert!(w.anomaly_end <= w.window_end);
            prop_assert!(w.anomaly_start - w.window_start <= margin);
            prop_assert!(w.window_end - w.anomaly_end <= margin);
        }
        for pair in windows.windows(2) {
            prop_assert!(pair[0].anomaly_end <= pair[1].anomaly_start);
        }
    }

    #[test]
    fn prepare_sorts_and_keeps_complete_rows(
        rows in prop::collection::vec((0i64..10_000, prop::option::of(-50.0f64..50.0), any::<bool>()), 0..80),
    ) {
        let time: Vec<Option<String>> = rows
            .iter()
            .map(|(m, _, _)| Some((t0() + TimeDelta::minutes(*m)).format("%Y-%m-%d %H:%M:%S").to_string()))
            .collect();
        let value: Vec<Option<String>> = rows.iter().map(|(_, v, _)| v.map(|v| format!("{v:.3}"))).collect();
        let event: Vec<Option<String>> = rows
            .iter()
            .map(|(_, _, e)| Some(if *e { "True" } else { "False" }.to_string()))
            .collect();
        let frame = RawFrame::from_columns(vec![
            RawColumn::new("Time", time),
            RawColumn::new("Cl", value),
            RawColumn::new("EVENT", event),
        ])
        .unwrap();

        let opts = PrepareOptions::default().with_numeric_cols(vec!["Cl".to_string()]);
        let table = prepare_time_series(&frame, &opts).unwrap();

        let complete = rows.iter().filter(|(_, v, _)| v.is_some());
        prop_assert_eq!(table.len(), complete.clone().count());
        prop_assert_eq!(table.event_count(), complete.filter(|(_, _, e)| *e).count());
        prop_assert!(table.index().windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(table.sensor("Cl").unwrap().iter().all(|v| v.is_finite()));

        // Preparing an already prepared table changes nothing.
        let again = prepare_time_series(&table.to_raw_frame(), &opts).unwrap();
        prop_assert_eq!(again, table);
    }
}
