use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::{debug, error};

use super::accumulator::Accumulator;

/// Label counted when the foreground application can't be determined, which mostly happens
/// while the desktop or the window manager itself has focus.
pub const FALLBACK_APP: &str = "desktop";

/// Reports which application currently has input focus.
#[cfg_attr(test, mockall::automock)]
pub trait FocusProvider: Send {
    fn current_foreground_app(&mut self) -> Result<String>;
}

/// Takes one focus sample per scheduler tick. Query failures never reach the scheduler.
pub struct FocusSampler {
    provider: Arc<Mutex<Box<dyn FocusProvider>>>,
}

impl FocusSampler {
    pub fn new(provider: Box<dyn FocusProvider>) -> Self {
        Self {
            provider: Arc::new(Mutex::new(provider)),
        }
    }

    pub fn sample(&self) -> String {
        let mut provider = self.provider.lock().unwrap_or_else(PoisonError::into_inner);
        match provider.current_foreground_app() {
            Ok(app) if !app.trim().is_empty() => app.trim().to_string(),
            Ok(_) => FALLBACK_APP.to_string(),
            Err(e) => {
                debug!("Focused app lookup failed, counting as {FALLBACK_APP}: {e:?}");
                FALLBACK_APP.to_string()
            }
        }
    }

    /// Samples on the blocking pool and counts the result. Backends may start processes or scan
    /// the process table.
    pub async fn sample_into(&self, accumulator: &Accumulator) {
        let sampler = Self {
            provider: self.provider.clone(),
        };
        match tokio::task::spawn_blocking(move || sampler.sample()).await {
            Ok(app) => accumulator.sample_focused_app(&app),
            Err(e) => {
                error!("Focused app lookup panicked, counting as {FALLBACK_APP}: {e:?}");
                accumulator.sample_focused_app(FALLBACK_APP);
            }
        }
    }
}
