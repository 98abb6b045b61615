use chrono::{Duration, NaiveDate, NaiveTime, ParseResult};

pub const LOG_DATE_FORMAT: &str = "%d/%m/%Y";
pub const LOG_TIME_FORMAT: &str = "%H:%M:%S";

pub fn format_log_date(date: NaiveDate) -> String {
    date.format(LOG_DATE_FORMAT).to_string()
}

pub fn format_log_time(time: NaiveTime) -> String {
    time.format(LOG_TIME_FORMAT).to_string()
}

pub fn parse_log_date(value: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), LOG_DATE_FORMAT)
}

pub fn parse_log_time(value: &str) -> ParseResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), LOG_TIME_FORMAT)
}

/// Compact human readable duration, e.g. `1h2m3s`, `4m0s` or `12s`.
pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_date_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        assert_eq!(format_log_date(date), "03/10/2024");
        assert_eq!(parse_log_date("03/10/2024").unwrap(), date);
    }

    #[test]
    fn log_time_is_zero_padded() {
        let time = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        assert_eq!(format_log_time(time), "07:05:09");
        assert_eq!(parse_log_time(" 07:05:09").unwrap(), time);
    }

    #[test]
    fn durations_drop_empty_leading_units() {
        assert_eq!(format_duration(Duration::seconds(12)), "12s");
        assert_eq!(format_duration(Duration::seconds(240)), "4m0s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
    }
}
