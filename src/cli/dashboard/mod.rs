//! Live dashboard for `keeptrack tui`. The tracker runs on the runtime as usual while the
//! terminal loop runs on a blocking thread and polls the shared state.

pub mod rate;
pub mod view;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::Local;
use rate::RateHistory;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::{runtime::Handle, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use view::{DashboardView, Tab};

use crate::{
    report::{PresetPeriod, Report},
    storage::{
        log_store::{LogContents, LogStore},
        record::LogRecord,
    },
    tracker::{
        accumulator::Accumulator, config::TrackerConfig, input::GenericEventSource,
        scheduler::FlushProgress, shutdown::detect_shutdown, Tracker,
    },
    utils::clock::DefaultClock,
};

use super::track::focus_provider;

const FRAME_TIME: Duration = Duration::from_millis(250);
const RATE_SAMPLE: Duration = Duration::from_secs(1);

/// What the terminal loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Continue,
    Quit,
}

struct Dashboard {
    accumulator: Arc<Accumulator>,
    store: LogStore,
    progress: watch::Receiver<FlushProgress>,
    runtime: Handle,
    tick: Duration,

    tab: Tab,
    selected_period: usize,
    rates: RateHistory,
    last_rate_sample: Instant,
    last_record: Option<LogRecord>,
    seen_flush: Option<chrono::NaiveDateTime>,
    contents: Option<LogContents>,
    report: Option<Report>,
}

impl Dashboard {
    fn new(
        accumulator: Arc<Accumulator>,
        store: LogStore,
        progress: watch::Receiver<FlushProgress>,
        runtime: Handle,
        tick: Duration,
    ) -> Self {
        Self {
            accumulator,
            store,
            progress,
            runtime,
            tick,
            tab: Tab::default(),
            selected_period: 0,
            rates: RateHistory::new(),
            last_rate_sample: Instant::now(),
            last_record: None,
            seen_flush: None,
            contents: None,
            report: None,
        }
    }

    /// Runs the terminal loop until the user quits or `shutdown` is cancelled elsewhere.
    fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let mut terminal = ratatui::init();
        self.refresh_last_record();

        let result = (|| -> Result<()> {
            while !shutdown.is_cancelled() {
                self.poll_state();
                let counts = self.accumulator.peek();
                let progress = self.progress.borrow().clone();
                terminal.draw(|frame| {
                    view::render(
                        frame,
                        &DashboardView {
                            tab: self.tab,
                            counts: &counts,
                            rates: &self.rates,
                            progress: &progress,
                            tick: self.tick,
                            last_record: self.last_record.as_ref(),
                            selected_period: self.selected_period,
                            report: self.report.as_ref(),
                            skipped_rows: self.contents.as_ref().map_or(0, |c| c.skipped),
                        },
                    )
                })?;

                if event::poll(FRAME_TIME)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) == Action::Quit {
                            shutdown.cancel();
                        }
                    }
                }
            }
            Ok(())
        })();

        ratatui::restore();
        result
    }

    fn poll_state(&mut self) {
        if self.last_rate_sample.elapsed() >= RATE_SAMPLE {
            self.last_rate_sample = Instant::now();
            self.rates.observe(self.accumulator.peek().key_presses);
        }

        let last_flush = self.progress.borrow().last_flush;
        if last_flush != self.seen_flush {
            self.seen_flush = last_flush;
            self.refresh_last_record();
            self.contents = None;
            self.report = None;
        }

        if self.tab == Tab::Reports && self.report.is_none() {
            self.load_report();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::Continue;
        }
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Action::Quit
            }
            KeyCode::Right => self.tab = self.tab.next(),
            KeyCode::Left => self.tab = self.tab.previous(),
            KeyCode::Down if self.tab == Tab::Reports => {
                self.selected_period = (self.selected_period + 1) % PresetPeriod::ALL.len();
                self.report = None;
            }
            KeyCode::Up if self.tab == Tab::Reports => {
                self.selected_period = (self.selected_period + PresetPeriod::ALL.len() - 1)
                    % PresetPeriod::ALL.len();
                self.report = None;
            }
            _ => (),
        }
        Action::Continue
    }

    fn refresh_last_record(&mut self) {
        match self.runtime.block_on(self.store.last_record()) {
            Ok(record) => self.last_record = record,
            Err(e) => error!("Failed to read the last logged row {e:?}"),
        }
    }

    fn load_report(&mut self) {
        if self.contents.is_none() {
            match self.runtime.block_on(self.store.read_all()) {
                Ok(contents) => self.contents = Some(contents),
                Err(e) => {
                    error!("Failed to read log for the report {e:?}");
                    self.contents = Some(LogContents::default());
                }
            }
        }
        let records = self
            .contents
            .as_ref()
            .map(|c| c.records.as_slice())
            .unwrap_or_default();
        let period = PresetPeriod::ALL[self.selected_period].resolve(Local::now().naive_local());
        self.report = Some(Report::aggregate_period(records, period));
    }
}

/// Runs the tracker with the dashboard in front of it. Quitting the dashboard stops the
/// tracker the same way an interrupt does.
pub async fn run_dashboard(config: TrackerConfig) -> Result<()> {
    let tracker = Tracker::acquire(config.clone())?;
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    let dashboard = Dashboard::new(
        tracker.accumulator(),
        tracker.store().clone(),
        tracker.subscribe(),
        Handle::current(),
        config.tick,
    );

    let tracking = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = tracker
                .run(
                    Box::new(GenericEventSource),
                    focus_provider(),
                    Box::new(DefaultClock),
                    shutdown.clone(),
                )
                .await;
            // Takes the dashboard down with a tracker that failed to start.
            shutdown.cancel();
            result
        })
    };

    let ui = tokio::task::spawn_blocking({
        let shutdown = shutdown.clone();
        move || dashboard.run(shutdown)
    });

    let ui_result = ui.await?;
    shutdown.cancel();
    let tracking_result = tracking.await?;
    info!("Dashboard closed");

    ui_result?;
    tracking_result
}
