use std::collections::VecDeque;

/// Seconds of history shown by the keys/sec sparkline.
pub const RATE_WINDOW: usize = 60;

/// Per-second deltas of a counter that resets at every flush.
#[derive(Debug, Clone, Default)]
pub struct RateHistory {
    last_total: Option<u64>,
    deltas: VecDeque<u64>,
}

impl RateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the counter value seen one second after the previous call.
    pub fn observe(&mut self, total: u64) {
        let delta = match self.last_total {
            // A smaller value means the interval was flushed in between.
            Some(last) if total >= last => total - last,
            Some(_) => total,
            None => 0,
        };
        self.last_total = Some(total);

        if self.deltas.len() == RATE_WINDOW {
            self.deltas.pop_front();
        }
        self.deltas.push_back(delta);
    }

    /// Oldest first, always [RATE_WINDOW] long so the sparkline doesn't stretch.
    pub fn samples(&self) -> Vec<u64> {
        let mut samples = vec![0; RATE_WINDOW - self.deltas.len()];
        samples.extend(self.deltas.iter().copied());
        samples
    }

    pub fn current(&self) -> u64 {
        self.deltas.back().copied().unwrap_or_default()
    }

    pub fn peak(&self) -> u64 {
        self.deltas.iter().copied().max().unwrap_or_default()
    }
}
