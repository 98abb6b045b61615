//! Aggregation of log rows into totals and ranked tables.
//!
//! Every row only carries its own top entries, so a label that fell out of one row's table is
//! undercounted in the merged table. The error is bounded by the per-row cutoff and is accepted.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::{
    storage::record::{top_k, LogRecord},
    tracker::accumulator::merge_table,
    utils::percentage::{count_percentage, Percentage},
};

/// Half-open range `[start, end)` of row timestamps. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Period {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

/// Fixed ranges offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetPeriod {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    LastYear,
    AllTime,
}

impl PresetPeriod {
    pub const ALL: [PresetPeriod; 6] = [
        PresetPeriod::Today,
        PresetPeriod::Yesterday,
        PresetPeriod::LastWeek,
        PresetPeriod::LastMonth,
        PresetPeriod::LastYear,
        PresetPeriod::AllTime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PresetPeriod::Today => "Today",
            PresetPeriod::Yesterday => "Yesterday",
            PresetPeriod::LastWeek => "Last week",
            PresetPeriod::LastMonth => "Last month",
            PresetPeriod::LastYear => "Last year",
            PresetPeriod::AllTime => "All time",
        }
    }

    /// Rolling ranges end at `now`. Today and yesterday follow calendar days.
    pub fn resolve(&self, now: NaiveDateTime) -> Period {
        let today = now.date().and_time(NaiveTime::MIN);
        let until_now = Some(now + Duration::seconds(1));
        match self {
            PresetPeriod::Today => Period::new(Some(today), until_now),
            PresetPeriod::Yesterday => Period::new(Some(today - Duration::days(1)), Some(today)),
            PresetPeriod::LastWeek => Period::new(Some(now - Duration::days(7)), until_now),
            PresetPeriod::LastMonth => Period::new(Some(now - Duration::days(30)), until_now),
            PresetPeriod::LastYear => Period::new(Some(now - Duration::days(365)), until_now),
            PresetPeriod::AllTime => Period::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedEntry {
    pub label: String,
    pub count: u64,
    /// Share of the table total.
    pub share: Percentage,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Totals {
    pub left_clicks: u64,
    pub right_clicks: u64,
    pub middle_clicks: u64,
    pub key_presses: u64,
    pub mouse_distance_meters: f64,
    pub scroll_distance: f64,
}

impl Totals {
    pub fn clicks(&self) -> u64 {
        self.left_clicks + self.right_clicks + self.middle_clicks
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Report {
    pub rows: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub totals: Totals,
    pub keys: Vec<RankedEntry>,
    /// Counts are focus samples, one per second.
    pub apps: Vec<RankedEntry>,
}

/// Every entry of `table`, highest count first, with its share of the table total.
pub fn rank(table: &HashMap<String, u64>) -> Vec<RankedEntry> {
    let total = table.values().sum::<u64>();
    top_k(table, usize::MAX)
        .into_iter()
        .map(|(label, count)| RankedEntry {
            share: count_percentage(count, total),
            label,
            count,
        })
        .collect()
}

impl Report {
    pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> Self {
        let mut totals = Totals::default();
        let mut keys = HashMap::new();
        let mut apps = HashMap::new();
        let mut rows = 0;
        let mut first: Option<NaiveDateTime> = None;
        let mut last: Option<NaiveDateTime> = None;

        for record in records {
            rows += 1;
            let at = record.timestamp();
            first = Some(first.map_or(at, |first| first.min(at)));
            last = Some(last.map_or(at, |last| last.max(at)));

            totals.left_clicks += record.left_clicks;
            totals.right_clicks += record.right_clicks;
            totals.middle_clicks += record.middle_clicks;
            totals.key_presses += record.key_presses;
            totals.mouse_distance_meters += record.mouse_distance_meters;
            totals.scroll_distance += record.scroll_distance;
            merge_table(&mut keys, record.top_keys.iter().cloned().collect());
            merge_table(&mut apps, record.top_apps.iter().cloned().collect());
        }

        Self {
            rows,
            first,
            last,
            totals,
            keys: rank(&keys),
            apps: rank(&apps),
        }
    }

    /// Aggregates only the rows stamped inside `period`.
    pub fn aggregate_period(records: &[LogRecord], period: Period) -> Self {
        Self::aggregate(
            records
                .iter()
                .filter(|record| period.contains(record.timestamp())),
        )
    }

    pub fn top_keys(&self, n: usize) -> &[RankedEntry] {
        &self.keys[..n.min(self.keys.len())]
    }

    pub fn top_apps(&self, n: usize) -> &[RankedEntry] {
        &self.apps[..n.min(self.apps.len())]
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, day)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
    }

    fn table(entries: &[(&str, u64)]) -> Vec<(String, u64)> {
        entries
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect()
    }

    fn record(at: NaiveDateTime, keys: &[(&str, u64)], apps: &[(&str, u64)]) -> LogRecord {
        LogRecord {
            date: at.date(),
            time: at.time(),
            left_clicks: 2,
            right_clicks: 1,
            middle_clicks: 0,
            key_presses: keys.iter().map(|(_, c)| c).sum(),
            mouse_distance_meters: 1.5,
            scroll_distance: 0.25,
            top_keys: table(keys),
            top_apps: table(apps),
        }
    }

    #[test]
    fn tables_are_merged_by_summing() {
        let records = [
            record(at(13, 10), &[("a", 3), ("ctrl + c", 1)], &[("nvim", 1200)]),
            record(at(13, 11), &[("a", 1), ("b", 4)], &[("nvim", 600), ("firefox", 1200)]),
        ];

        let report = Report::aggregate(&records);

        assert_eq!(report.rows, 2);
        assert_eq!(
            report
                .keys
                .iter()
                .map(|e| (e.label.as_str(), e.count))
                .collect::<Vec<_>>(),
            vec![("a", 4), ("b", 4), ("ctrl + c", 1)]
        );
        assert_eq!(report.apps[0].label, "nvim");
        assert_eq!(report.apps[0].count, 1800);
        assert_eq!(report.totals.key_presses, 9);
        assert_eq!(report.totals.clicks(), 6);
        assert_eq!(report.totals.mouse_distance_meters, 3.);
        assert_eq!(report.first, Some(at(13, 10)));
        assert_eq!(report.last, Some(at(13, 11)));
    }

    #[test]
    fn shares_are_relative_to_the_table_total() {
        let records = [record(at(13, 10), &[("a", 3), ("b", 1)], &[])];

        let report = Report::aggregate(&records);

        assert_eq!(*report.keys[0].share, 75.);
        assert_eq!(*report.keys[1].share, 25.);
        assert!(report.apps.is_empty());
    }

    #[test]
    fn empty_input_gives_an_empty_report() {
        let report = Report::aggregate(&[] as &[LogRecord]);

        assert_eq!(report, Report::default());
        assert!(report.top_keys(5).is_empty());
    }

    #[test]
    fn top_entries_are_bounded() {
        let keys = (0..30)
            .map(|i| (format!("k{i:02}"), 30 - i as u64))
            .collect::<Vec<_>>();
        let records = [LogRecord {
            top_keys: keys.clone(),
            ..record(at(13, 10), &[], &[])
        }];

        let report = Report::aggregate(&records);

        assert_eq!(report.top_keys(5).len(), 5);
        assert_eq!(report.top_keys(20).len(), 20);
        assert_eq!(report.top_keys(5)[0].label, "k00");
    }

    #[test]
    fn period_filter_is_half_open() {
        let records = [
            record(at(12, 23), &[("a", 1)], &[]),
            record(at(13, 0), &[("b", 1)], &[]),
            record(at(14, 0), &[("c", 1)], &[]),
        ];

        let report =
            Report::aggregate_period(&records, Period::new(Some(at(13, 0)), Some(at(14, 0))));

        assert_eq!(report.rows, 1);
        assert_eq!(report.keys[0].label, "b");
    }

    #[test]
    fn preset_periods() {
        let now = at(13, 15);

        let today = PresetPeriod::Today.resolve(now);
        let yesterday = PresetPeriod::Yesterday.resolve(now);

        assert!(today.contains(at(13, 0)));
        assert!(today.contains(now));
        assert!(!today.contains(at(12, 23)));
        assert!(yesterday.contains(at(12, 23)));
        assert!(!yesterday.contains(at(13, 0)));
        assert!(PresetPeriod::LastWeek.resolve(now).contains(at(7, 0)));
        assert!(!PresetPeriod::LastWeek.resolve(now).contains(at(6, 0)));
        assert_eq!(PresetPeriod::AllTime.resolve(now), Period::default());
    }
}
