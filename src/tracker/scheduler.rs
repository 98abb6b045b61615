use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    storage::{log_store::LogStore, record::LogRecord},
    utils::clock::Clock,
};

use super::{accumulator::Accumulator, focus::FocusSampler};

/// Where the scheduler is inside the current interval. Published after every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushProgress {
    pub elapsed_ticks: u64,
    pub interval_ticks: u64,
    pub last_flush: Option<NaiveDateTime>,
}

impl FlushProgress {
    pub fn ticks_until_flush(&self) -> u64 {
        self.interval_ticks.saturating_sub(self.elapsed_ticks)
    }
}

/// Turns the running interval into a log row. Must stay `Sync`, it is borrowed across the append.
struct Flusher {
    accumulator: Arc<Accumulator>,
    store: LogStore,
    clock: Box<dyn Clock>,
    top_k: usize,
}

impl Flusher {
    async fn flush(&self) -> Result<LogRecord> {
        let counts = self.accumulator.snapshot_and_reset();
        let at = self.clock.local_time().naive_local();
        let record = LogRecord::from_counts(&counts, at, self.top_k);
        debug!("Appending {record:?}");

        match self.store.append(&record).await {
            Ok(()) => {
                info!(
                    "Logged interval ending {at}: {} keys, {} clicks, {:.2} m",
                    record.key_presses,
                    record.left_clicks + record.right_clicks + record.middle_clicks,
                    record.mouse_distance_meters,
                );
                Ok(record)
            }
            Err(e) => {
                self.accumulator.restore(counts);
                Err(e)
            }
        }
    }
}

/// Drives the tracker: one focus sample per tick, one log row every `flush_every` ticks and a
/// final row once the shutdown token is cancelled.
pub struct FlushScheduler {
    flusher: Flusher,
    sampler: FocusSampler,
    shutdown: CancellationToken,
    tick: Duration,
    flush_every: u64,
    notify: bool,
    progress: watch::Sender<FlushProgress>,
}

impl FlushScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accumulator: Arc<Accumulator>,
        sampler: FocusSampler,
        store: LogStore,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
        tick: Duration,
        flush_every: u64,
        top_k: usize,
        notify: bool,
        progress: watch::Sender<FlushProgress>,
    ) -> Self {
        Self {
            flusher: Flusher {
                accumulator,
                store,
                clock,
                top_k,
            },
            sampler,
            shutdown,
            tick,
            flush_every: flush_every.max(1),
            notify,
            progress,
        }
    }

    /// Executes the tick loop until shutdown. Errors of scheduled flushes are logged and the
    /// interval is kept for the next attempt. An error of the final flush is returned.
    pub async fn run(mut self) -> Result<()> {
        let mut deadline = self.flusher.clock.instant();
        let mut elapsed = 0u64;
        let mut last_flush = None;

        loop {
            self.progress.send_replace(FlushProgress {
                elapsed_ticks: elapsed,
                interval_ticks: self.flush_every,
                last_flush,
            });

            deadline += self.tick;
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.flusher.clock.sleep_until(deadline) => (),
            }

            self.sampler.sample_into(&self.flusher.accumulator).await;
            elapsed += 1;

            if elapsed >= self.flush_every {
                elapsed = 0;
                match self.flusher.flush().await {
                    Ok(record) => {
                        last_flush = Some(record.timestamp());
                        if self.notify {
                            println!("Logged.");
                        }
                    }
                    Err(e) => {
                        error!("Failed to write interval, keeping it for the next flush: {e:?}")
                    }
                }
            }
        }

        info!("Shutting down, writing the final interval");
        self.flusher.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::time::Instant;

    use crate::{
        storage::record::TOP_K,
        tracker::{
            chord::Key,
            focus::MockFocusProvider,
            input::{Button, InputEvent},
        },
        utils::logging::TEST_LOGGING,
    };

    use super::*;

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 10, 13).unwrap(), NaiveTime::MIN);

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start_time: Utc.from_utc_datetime(&TEST_START_DATE),
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    fn focus_on(app: &'static str) -> FocusSampler {
        let mut provider = MockFocusProvider::new();
        provider
            .expect_current_foreground_app()
            .returning(move || Ok(app.to_string()));
        FocusSampler::new(Box::new(provider))
    }

    fn scheduler(
        accumulator: Arc<Accumulator>,
        store: LogStore,
        shutdown: CancellationToken,
        flush_every: u64,
    ) -> (FlushScheduler, watch::Receiver<FlushProgress>) {
        let (progress, receiver) = watch::channel(FlushProgress::default());
        let scheduler = FlushScheduler::new(
            accumulator,
            focus_on("nvim"),
            store,
            Box::new(TestClock::new()),
            shutdown,
            Duration::from_secs(1),
            flush_every,
            TOP_K,
            false,
            progress,
        );
        (scheduler, receiver)
    }

    fn press(c: char) -> InputEvent {
        InputEvent::KeyPress {
            key: Key::Char(c),
            symbol: Some(c),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_every_interval_and_on_shutdown() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = LogStore::new(dir.path())?;
        let accumulator = Arc::new(Accumulator::new());
        let shutdown = CancellationToken::new();
        for _ in 0..3 {
            accumulator.record(press('x'));
        }
        accumulator.record(InputEvent::ButtonPress(Button::Left));

        let (scheduler, _) = scheduler(accumulator.clone(), store.clone(), shutdown.clone(), 3);
        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(7500)).await;
                shutdown.cancel();
            },
            scheduler.run(),
        );
        result?;

        let records = store.read_all().await?.records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].top_keys, vec![("x".to_string(), 3)]);
        assert_eq!(records[0].left_clicks, 1);
        assert_eq!(records[0].top_apps, vec![("nvim".to_string(), 3)]);
        assert_eq!(records[1].key_presses, 0);
        assert_eq!(records[1].top_apps, vec![("nvim".to_string(), 3)]);
        // Final row carries the seconds after the last full interval.
        assert_eq!(records[2].top_apps, vec![("nvim".to_string(), 1)]);
        assert!(accumulator.peek().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_interval_still_writes_a_row() -> Result<()> {
        let dir = tempdir()?;
        let store = LogStore::new(dir.path())?;
        let accumulator = Arc::new(Accumulator::new());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let (scheduler, _) = scheduler(accumulator, store.clone(), shutdown, 1800);
        scheduler.run().await?;

        let records = store.read_all().await?.records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key_presses, 0);
        assert!(records[0].top_keys.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failed_append_keeps_the_interval() -> Result<()> {
        let dir = tempdir()?;
        let store = LogStore::new(dir.path())?;
        // A directory where the log file should be makes every append fail.
        std::fs::create_dir(store.path())?;
        let accumulator = Arc::new(Accumulator::new());
        let shutdown = CancellationToken::new();
        accumulator.record(press('a'));
        accumulator.record(press('a'));

        let (scheduler, _) = scheduler(accumulator.clone(), store, shutdown.clone(), 2);
        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(4500)).await;
                shutdown.cancel();
            },
            scheduler.run(),
        );

        assert!(result.is_err());
        let kept = accumulator.peek();
        assert_eq!(kept.key_presses, 2);
        assert_eq!(kept.key_combinations["a"], 2);
        assert_eq!(kept.app_focus["nvim"], 4);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_published_every_tick() -> Result<()> {
        let dir = tempdir()?;
        let store = LogStore::new(dir.path())?;
        let shutdown = CancellationToken::new();

        let (scheduler, progress) =
            scheduler(Arc::new(Accumulator::new()), store, shutdown.clone(), 10);
        let (seen, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(3500)).await;
                let seen = progress.borrow().clone();
                shutdown.cancel();
                seen
            },
            scheduler.run(),
        );
        result?;

        assert_eq!(seen.elapsed_ticks, 3);
        assert_eq!(seen.ticks_until_flush(), 7);
        assert_eq!(seen.last_flush, None);
        Ok(())
    }
}
