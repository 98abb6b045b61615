use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use thiserror::Error;

use crate::{
    fs::csv::{join_record, split_record},
    tracker::accumulator::ActivityCounts,
    utils::time::{format_log_date, format_log_time, parse_log_date, parse_log_time},
};

/// Entries kept per frequency table in a row.
pub const TOP_K: usize = 50;

/// Cell value of an empty frequency table.
pub const EMPTY_TABLE: &str = "None";

pub const HEADER: [&str; 10] = [
    "Log Date",
    "Log Time",
    "Left Click",
    "Right Click",
    "Middle Click",
    "Keypress",
    "Mouse Distance (meters)",
    "Scroll Distance (delta accumulation)",
    "Most Used Keys (presses)",
    "Most Used Apps (seconds)",
];

pub fn header_row() -> String {
    join_record(HEADER)
}

/// Frequency table entries ordered by count, highest first.
pub type RankedTable = Vec<(String, u64)>;

#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("Row has an unterminated quoted field")]
    Unterminated,

    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Invalid date {0:?}")]
    Date(String),

    #[error("Invalid time {0:?}")]
    Time(String),

    #[error("Invalid value {value:?} in column '{column}'")]
    Number { column: &'static str, value: String },

    #[error("Invalid table in column '{column}': {source}")]
    Table {
        column: &'static str,
        source: serde_json::Error,
    },
}

/// One persisted interval. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub left_clicks: u64,
    pub right_clicks: u64,
    pub middle_clicks: u64,
    pub key_presses: u64,
    pub mouse_distance_meters: f64,
    pub scroll_distance: f64,
    pub top_keys: RankedTable,
    pub top_apps: RankedTable,
}

/// The `k` highest counts, highest first. Equal counts are ordered by label so output is stable.
pub fn top_k(table: &HashMap<String, u64>, k: usize) -> RankedTable {
    let mut entries = table
        .iter()
        .map(|(label, count)| (label.clone(), *count))
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(k);
    entries
}

/// Renders a table as `{"label": count, ...}`, or `None` when it's empty.
pub fn encode_table(entries: &[(String, u64)]) -> String {
    if entries.is_empty() {
        return EMPTY_TABLE.to_string();
    }
    let body = entries
        .iter()
        .map(|(label, count)| format!("{}: {count}", serde_json::Value::from(label.as_str())))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

pub fn decode_table(
    cell: &str,
    column: &'static str,
) -> Result<HashMap<String, u64>, RecordParseError> {
    let cell = cell.trim();
    if cell == EMPTY_TABLE || cell.is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(cell).map_err(|source| RecordParseError::Table { column, source })
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    column: &'static str,
) -> Result<T, RecordParseError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| RecordParseError::Number {
            column,
            value: value.to_string(),
        })
}

impl LogRecord {
    /// Builds the row for an interval ending at `at`. The log keeps whole seconds only.
    pub fn from_counts(counts: &ActivityCounts, at: NaiveDateTime, k: usize) -> Self {
        let at = at.trunc_subsecs(0);
        Self {
            date: at.date(),
            time: at.time(),
            left_clicks: counts.left_clicks,
            right_clicks: counts.right_clicks,
            middle_clicks: counts.middle_clicks,
            key_presses: counts.key_presses,
            mouse_distance_meters: counts.mouse_distance_meters,
            scroll_distance: counts.scroll_distance,
            top_keys: top_k(&counts.key_combinations, k),
            top_apps: top_k(&counts.app_focus, k),
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn to_row(&self) -> String {
        join_record([
            format_log_date(self.date),
            format_log_time(self.time),
            self.left_clicks.to_string(),
            self.right_clicks.to_string(),
            self.middle_clicks.to_string(),
            self.key_presses.to_string(),
            self.mouse_distance_meters.to_string(),
            self.scroll_distance.to_string(),
            encode_table(&self.top_keys),
            encode_table(&self.top_apps),
        ])
    }

    pub fn parse_row(line: &str) -> Result<Self, RecordParseError> {
        let fields = split_record(line).ok_or(RecordParseError::Unterminated)?;
        let [date, time, left, right, middle, keys, distance, scroll, key_table, app_table] =
            <[String; 10]>::try_from(fields).map_err(|fields| RecordParseError::FieldCount {
                expected: HEADER.len(),
                found: fields.len(),
            })?;

        Ok(Self {
            date: parse_log_date(&date).map_err(|_| RecordParseError::Date(date.clone()))?,
            time: parse_log_time(&time).map_err(|_| RecordParseError::Time(time.clone()))?,
            left_clicks: parse_number(&left, HEADER[2])?,
            right_clicks: parse_number(&right, HEADER[3])?,
            middle_clicks: parse_number(&middle, HEADER[4])?,
            key_presses: parse_number(&keys, HEADER[5])?,
            mouse_distance_meters: parse_number(&distance, HEADER[6])?,
            scroll_distance: parse_number(&scroll, HEADER[7])?,
            top_keys: top_k(&decode_table(&key_table, HEADER[8])?, usize::MAX),
            top_apps: top_k(&decode_table(&app_table, HEADER[9])?, usize::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 13)
            .unwrap()
            .and_hms_opt(20, 14, 44)
            .unwrap()
    }

    fn counts() -> ActivityCounts {
        ActivityCounts {
            key_presses: 352,
            left_clicks: 4,
            right_clicks: 1,
            middle_clicks: 0,
            mouse_distance_meters: 12.5,
            scroll_distance: 0.36,
            key_combinations: HashMap::from([
                ("a".to_string(), 340),
                ("ctrl + c".to_string(), 12),
            ]),
            app_focus: HashMap::new(),
        }
    }

    #[test]
    fn header_matches_log_format() {
        assert_eq!(
            header_row(),
            "Log Date,Log Time,Left Click,Right Click,Middle Click,Keypress,\
             Mouse Distance (meters),Scroll Distance (delta accumulation),\
             Most Used Keys (presses),Most Used Apps (seconds)"
        );
    }

    #[test]
    fn row_layout() {
        let row = LogRecord::from_counts(&counts(), at(), TOP_K).to_row();
        assert_eq!(
            row,
            r#"13/10/2024,20:14:44,4,1,0,352,12.5,0.36,"{""a"": 340, ""ctrl + c"": 12}",None"#
        );
    }

    #[test]
    fn written_row_reads_back() {
        let record = LogRecord::from_counts(&counts(), at(), TOP_K);
        assert_eq!(LogRecord::parse_row(&record.to_row()).unwrap(), record);
    }

    #[test]
    fn sub_second_timestamps_read_back() {
        let precise = at() + chrono::Duration::milliseconds(500);
        let record = LogRecord::from_counts(&counts(), precise, TOP_K);

        assert_eq!(record.timestamp(), at());
        assert_eq!(LogRecord::parse_row(&record.to_row()).unwrap(), record);
    }

    #[test]
    fn awkward_labels_read_back() {
        let mut counts = ActivityCounts::default();
        counts.key_combinations = HashMap::from([
            (",".to_string(), 2),
            ("\"".to_string(), 3),
            ("\\".to_string(), 1),
        ]);
        counts.app_focus = HashMap::from([("Visual Studio Code".to_string(), 60)]);

        let record = LogRecord::from_counts(&counts, at(), TOP_K);
        let parsed = LogRecord::parse_row(&record.to_row()).unwrap();

        assert_eq!(parsed.top_keys, record.top_keys);
        assert_eq!(parsed.top_apps, record.top_apps);
    }

    #[test]
    fn top_k_keeps_highest_counts() {
        let table = (0..120u64)
            .map(|i| (format!("key{i}"), i % 60))
            .collect::<HashMap<_, _>>();

        let kept = top_k(&table, TOP_K);

        assert_eq!(kept.len(), TOP_K);
        let lowest_kept = kept.last().unwrap().1;
        let highest_dropped = table
            .iter()
            .filter(|(label, _)| !kept.iter().any(|(k, _)| k == *label))
            .map(|(_, count)| *count)
            .max()
            .unwrap();
        assert!(highest_dropped <= lowest_kept);
        assert!(kept.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn short_rows_are_rejected() {
        let err = LogRecord::parse_row("13/10/2024,20:14:44,1").unwrap_err();
        assert!(matches!(
            err,
            RecordParseError::FieldCount {
                expected: 10,
                found: 3
            }
        ));
    }

    #[test]
    fn broken_table_is_reported_by_column() {
        let err =
            LogRecord::parse_row(r#"13/10/2024,20:14:44,1,0,0,3,0,0,"{""a"": }",None"#)
                .unwrap_err();
        assert!(matches!(
            err,
            RecordParseError::Table {
                column: "Most Used Keys (presses)",
                ..
            }
        ));
    }

    #[test]
    fn python_style_floats_are_accepted() {
        let record =
            LogRecord::parse_row("13/10/2024,20:14:44,0,0,0,0,0.0,1e-3,None,None").unwrap();
        assert_eq!(record.mouse_distance_meters, 0.);
        assert_eq!(record.scroll_distance, 0.001);
        assert!(record.top_keys.is_empty());
    }
}
