//! The tracking engine. Input listeners write into the [accumulator::Accumulator] from their own
//! threads, while the [scheduler::FlushScheduler] samples the focused app every tick and turns the
//! accumulated interval into a log row.

use std::sync::Arc;

use anyhow::Result;
use config::TrackerConfig;
use focus::{FocusProvider, FocusSampler};
use input::EventSource;
use lock::InstanceLock;
use scheduler::{FlushProgress, FlushScheduler};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{storage::log_store::LogStore, utils::clock::Clock};

use accumulator::Accumulator;

pub mod accumulator;
pub mod chord;
pub mod config;
pub mod focus;
pub mod input;
pub mod lock;
pub mod scheduler;
pub mod shutdown;

/// A tracker that owns the instance lock but hasn't started listening yet.
pub struct Tracker {
    config: TrackerConfig,
    lock: InstanceLock,
    accumulator: Arc<Accumulator>,
    store: LogStore,
    progress: watch::Sender<FlushProgress>,
}

impl Tracker {
    /// Takes the instance lock before anything touches the log directory.
    pub fn acquire(config: TrackerConfig) -> Result<Self> {
        let lock = InstanceLock::acquire(config.lock_port)?;
        let store = LogStore::new(&config.log_dir)?;
        let (progress, _) = watch::channel(FlushProgress {
            interval_ticks: config.flush_interval,
            ..Default::default()
        });

        Ok(Self {
            config,
            lock,
            accumulator: Arc::new(Accumulator::new()),
            store,
            progress,
        })
    }

    pub fn accumulator(&self) -> Arc<Accumulator> {
        self.accumulator.clone()
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<FlushProgress> {
        self.progress.subscribe()
    }

    /// Starts the event source and runs the scheduler until `shutdown` is cancelled. The lock is
    /// released once the final row is written, or the write has failed.
    pub async fn run(
        self,
        source: Box<dyn EventSource>,
        focus: Box<dyn FocusProvider>,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let Self {
            config,
            lock,
            accumulator,
            store,
            progress,
        } = self;

        source.start(accumulator.clone())?;
        info!(
            "Tracking into {:?}, one row every {} ticks of {:?}",
            store.path(),
            config.flush_interval,
            config.tick
        );

        let scheduler = FlushScheduler::new(
            accumulator,
            FocusSampler::new(focus),
            store,
            clock,
            shutdown,
            config.tick,
            config.flush_interval,
            config.top_k,
            config.notify,
            progress,
        );
        let result = scheduler.run().await;
        drop(lock);
        result
    }
}
