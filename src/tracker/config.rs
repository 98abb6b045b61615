use std::{path::PathBuf, time::Duration};

use crate::storage::record::TOP_K;

use super::lock::DEFAULT_LOCK_PORT;

/// Ticks between two log rows. At one tick per second this is half an hour.
pub const DEFAULT_FLUSH_INTERVAL: u64 = 1800;

/// App focus is stored in seconds, which only holds while one tick is one second.
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub log_dir: PathBuf,
    pub flush_interval: u64,
    pub tick: Duration,
    pub top_k: usize,
    pub lock_port: u16,
    /// Print a line to stdout after every scheduled flush.
    pub notify: bool,
}

impl TrackerConfig {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            tick: TICK,
            top_k: TOP_K,
            lock_port: DEFAULT_LOCK_PORT,
            notify: false,
        }
    }
}
