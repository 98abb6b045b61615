use std::time::Duration;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, List, ListItem, ListState, Paragraph, Row, Sparkline, Table, Tabs},
    Frame,
};

use crate::{
    report::{rank, PresetPeriod, RankedEntry, Report},
    storage::record::LogRecord,
    tracker::{accumulator::ActivityCounts, scheduler::FlushProgress},
    utils::time::{format_duration, format_log_date, format_log_time},
};

use super::rate::{RateHistory, RATE_WINDOW};

/// Entries listed per table on the activity tab.
const LIVE_TOP: usize = 10;
/// Entries listed per table on the reports tab.
const REPORT_TOP: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Activity,
    Reports,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Activity, Tab::Reports];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Activity => "Activity",
            Tab::Reports => "Reports",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|tab| tab == self).unwrap_or_default()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Everything one frame shows. Built fresh for every draw.
pub struct DashboardView<'a> {
    pub tab: Tab,
    pub counts: &'a ActivityCounts,
    pub rates: &'a RateHistory,
    pub progress: &'a FlushProgress,
    pub tick: Duration,
    pub last_record: Option<&'a LogRecord>,
    pub selected_period: usize,
    pub report: Option<&'a Report>,
    pub skipped_rows: usize,
}

pub fn render(frame: &mut Frame, view: &DashboardView) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let tabs = Tabs::new(Tab::ALL.iter().map(|tab| tab.title()))
        .select(view.tab.index())
        .highlight_style(Style::new().fg(Color::Black).bg(Color::LightBlue))
        .block(Block::bordered().title(" keeptrack "));
    frame.render_widget(tabs, header);

    match view.tab {
        Tab::Activity => render_activity(frame, body, view),
        Tab::Reports => render_reports(frame, body, view),
    }

    render_footer(frame, footer, view);
}

fn render_activity(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);
    let [counters, sparkline] =
        Layout::vertical([Constraint::Length(9), Constraint::Fill(1)]).areas(left);
    let [keys, apps] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(right);

    let counts = view.counts;
    let lines = vec![
        counter_line("Key presses", counts.key_presses.to_string()),
        counter_line("Left clicks", counts.left_clicks.to_string()),
        counter_line("Right clicks", counts.right_clicks.to_string()),
        counter_line("Middle clicks", counts.middle_clicks.to_string()),
        counter_line(
            "Mouse distance",
            format!("{:.2} m", counts.mouse_distance_meters),
        ),
        counter_line("Scroll distance", format!("{:.2}", counts.scroll_distance)),
        counter_line("Keys/sec", view.rates.current().to_string()),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" Current interval ")),
        counters,
    );

    let samples = view.rates.samples();
    frame.render_widget(
        Sparkline::default()
            .block(Block::bordered().title(format!(
                " Keys/sec, last {RATE_WINDOW}s (peak {}) ",
                view.rates.peak()
            )))
            .style(Style::new().fg(Color::Cyan))
            .data(&samples),
        sparkline,
    );

    let top_keys = rank(&counts.key_combinations);
    let top_apps = rank(&counts.app_focus);
    frame.render_widget(
        ranked_table(" Top keys ", &top_keys[..LIVE_TOP.min(top_keys.len())], false),
        keys,
    );
    frame.render_widget(
        ranked_table(" Top apps ", &top_apps[..LIVE_TOP.min(top_apps.len())], true),
        apps,
    );
}

fn render_reports(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let [periods, details] =
        Layout::horizontal([Constraint::Length(20), Constraint::Fill(1)]).areas(area);

    let items = PresetPeriod::ALL
        .iter()
        .map(|period| ListItem::new(period.name()))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::bordered().title(" Period "))
        .highlight_style(Style::new().fg(Color::Black).bg(Color::Red))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(view.selected_period));
    frame.render_stateful_widget(list, periods, &mut state);

    let Some(report) = view.report else {
        frame.render_widget(
            Paragraph::new("Loading...").block(Block::bordered().title(" Details ")),
            details,
        );
        return;
    };

    let [summary, tables] =
        Layout::vertical([Constraint::Length(6), Constraint::Fill(1)]).areas(details);
    let [keys, apps] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(tables);

    let totals = &report.totals;
    let mut lines = vec![
        Line::from(format!(
            "{} rows, {} key presses, {} clicks ({} left, {} right, {} middle)",
            report.rows,
            totals.key_presses,
            totals.clicks(),
            totals.left_clicks,
            totals.right_clicks,
            totals.middle_clicks
        )),
        Line::from(format!(
            "Mouse distance {:.2} m, scroll distance {:.2}",
            totals.mouse_distance_meters, totals.scroll_distance
        )),
    ];
    if let (Some(first), Some(last)) = (report.first, report.last) {
        lines.push(Line::from(format!(
            "From {} {} to {} {}",
            format_log_date(first.date()),
            format_log_time(first.time()),
            format_log_date(last.date()),
            format_log_time(last.time())
        )));
    }
    if view.skipped_rows > 0 {
        lines.push(Line::from(Span::styled(
            format!("{} malformed rows skipped", view.skipped_rows),
            Style::new().fg(Color::Yellow),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" Summary ")),
        summary,
    );
    frame.render_widget(
        ranked_table(" Top keys ", report.top_keys(REPORT_TOP), false),
        keys,
    );
    frame.render_widget(
        ranked_table(" Top apps ", report.top_apps(REPORT_TOP), true),
        apps,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let [status, help] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(44)]).areas(area);

    let remaining = view.tick.as_millis() as i64 * view.progress.ticks_until_flush() as i64;
    let mut spans = vec![Span::raw(format!(
        " Next flush in {}",
        format_duration(chrono::Duration::milliseconds(remaining))
    ))];
    if let Some(record) = view.last_record {
        spans.push(Span::raw(format!(
            " | Last logged {} {}: {} keys, {} clicks",
            format_log_date(record.date),
            format_log_time(record.time),
            record.key_presses,
            record.left_clicks + record.right_clicks + record.middle_clicks
        )));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::new().fg(Color::Black).bg(Color::White)),
        status,
    );
    frame.render_widget(
        Paragraph::new("←/→ tabs  ↑/↓ period  q quit ")
            .alignment(Alignment::Right)
            .style(Style::new().fg(Color::Black).bg(Color::White)),
        help,
    );
}

fn counter_line(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{name:<16}")),
        Span::styled(value, Style::new().add_modifier(Modifier::BOLD)),
    ])
}

fn ranked_table<'a>(title: &'a str, entries: &[RankedEntry], as_duration: bool) -> Table<'a> {
    let rows = entries.iter().map(|entry| {
        let count = if as_duration {
            format_duration(chrono::Duration::seconds(entry.count as i64))
        } else {
            entry.count.to_string()
        };
        Row::new(vec![
            entry.label.clone(),
            count,
            format!("{:.1}", entry.share),
        ])
    });

    Table::new(
        rows,
        [
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(7),
        ],
    )
    .block(Block::bordered().title(title))
}
