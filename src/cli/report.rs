use std::{fmt::Display, path::Path};

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::{
    report::{Period, RankedEntry, Report},
    storage::log_store::LogStore,
    utils::time::{format_duration, format_log_date, format_log_time},
};

use super::Args;

const DEFAULT_TOP: usize = 5;
const FULL_TOP: usize = 20;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ReportCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"today\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option covers the whole day"
    )]
    treat_as_days: bool,
    #[arg(long, help = "Show the top 20 keys and apps instead of the top 5")]
    full: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

/// Command to process `report`. Aggregates every row of the log inside the requested range.
pub async fn process_report_command(command: ReportCommand, dir: &Path) -> Result<()> {
    let period = parse_period(
        command.start_date,
        command.end_date,
        command.date_style,
        command.treat_as_days,
        Local::now(),
    )?;

    let store = LogStore::new(dir)?;
    if !store.exists() {
        println!("No log file found in {}.", dir.display());
        return Ok(());
    }

    let contents = store.read_all().await?;
    let report = Report::aggregate_period(&contents.records, period);

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let top = if command.full { FULL_TOP } else { DEFAULT_TOP };
        print!("{}", render_report(&report, top));
    }

    if contents.skipped > 0 {
        eprintln!(
            "{}",
            Colour::Yellow.paint(format!(
                "warning: {} malformed rows were skipped",
                contents.skipped
            ))
        );
    }
    Ok(())
}

fn parse_date(
    value: Option<String>,
    now: DateTime<Local>,
    dialect: chrono_english::Dialect,
    name: &str,
) -> Result<Option<NaiveDateTime>> {
    match value.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => Ok(Some(v.naive_local())),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
        None => Ok(None),
    }
}

/// Missing bounds leave the range open on that side.
fn parse_period(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
    now: DateTime<Local>,
) -> Result<Period> {
    let dialect: chrono_english::Dialect = date_style.into();
    let mut start = parse_date(start_date, now, dialect, "start")?;
    let mut end = parse_date(end_date, now, dialect, "end")?;

    if treat_as_days {
        start = start.map(|v| v.date().and_time(NaiveTime::MIN));
        end = end.map(|v| (v.date() + Duration::days(1)).and_time(NaiveTime::MIN));
    }

    Ok(Period::new(start, end))
}

fn render_report(report: &Report, top: usize) -> String {
    let bold = Style::new().bold();
    let mut out = String::new();

    if report.rows == 0 {
        out.push_str("No activity logged in this range.\n");
        return out;
    }

    if let (Some(first), Some(last)) = (report.first, report.last) {
        out.push_str(&format!(
            "{} {} {} - {} {} ({} rows)\n\n",
            bold.paint("Activity"),
            format_log_date(first.date()),
            format_log_time(first.time()),
            format_log_date(last.date()),
            format_log_time(last.time()),
            report.rows
        ));
    }

    let totals = &report.totals;
    out.push_str(&format!("{:<18}{}\n", "Key presses", totals.key_presses));
    out.push_str(&format!(
        "{:<18}{} ({} left, {} right, {} middle)\n",
        "Clicks",
        totals.clicks(),
        totals.left_clicks,
        totals.right_clicks,
        totals.middle_clicks
    ));
    out.push_str(&format!(
        "{:<18}{:.2} m\n",
        "Mouse distance", totals.mouse_distance_meters
    ));
    out.push_str(&format!(
        "{:<18}{:.2}\n",
        "Scroll distance", totals.scroll_distance
    ));

    out.push_str(&format!("\n{}\n", bold.paint(format!("Top {top} keys"))));
    push_entries(&mut out, report.top_keys(top), |count| count.to_string());
    out.push_str(&format!("\n{}\n", bold.paint(format!("Top {top} apps"))));
    push_entries(&mut out, report.top_apps(top), |count| {
        format_duration(Duration::seconds(count as i64))
    });
    out
}

fn push_entries(out: &mut String, entries: &[RankedEntry], count: impl Fn(u64) -> String) {
    if entries.is_empty() {
        out.push_str("  (none)\n");
    }
    for entry in entries {
        out.push_str(&format!(
            "  {:>6.1}\t{:>10}\t{}\n",
            entry.share,
            count(entry.count),
            entry.label
        ));
    }
}
