use anyhow::{anyhow, Result};
use tracing::instrument;
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

use crate::tracker::focus::FocusProvider;

use super::process_tree::ProcessResolver;

fn foreground_pid() -> Result<u32> {
    let window = unsafe { GetForegroundWindow() };
    if window.is_invalid() {
        return Err(anyhow!("Failed to get foreground window"));
    }

    let mut id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut id)) };
    if id == 0 {
        return Err(anyhow!("Foreground window has no owning process"));
    }
    Ok(id)
}

pub struct WindowsFocusProvider {
    resolver: ProcessResolver,
}

impl WindowsFocusProvider {
    pub fn new() -> Self {
        Self {
            resolver: ProcessResolver::new(),
        }
    }
}

impl Default for WindowsFocusProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusProvider for WindowsFocusProvider {
    #[instrument(skip(self))]
    fn current_foreground_app(&mut self) -> Result<String> {
        let pid = foreground_pid()?;
        self.resolver.resolve(pid)
    }
}
