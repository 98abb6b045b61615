use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::instrument;

use crate::tracker::focus::FocusProvider;

use super::process_tree::ProcessResolver;

/// Asks `xdotool` for the pid owning the focused window. Works on any X11 session that has the
/// tool installed, without linking against X libraries.
pub struct XdotoolFocusProvider {
    resolver: ProcessResolver,
}

impl XdotoolFocusProvider {
    pub fn new() -> Self {
        Self {
            resolver: ProcessResolver::new(),
        }
    }
}

impl Default for XdotoolFocusProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn focused_window_pid() -> Result<u32> {
    let output = Command::new("xdotool")
        .args(["getwindowfocus", "getwindowpid"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .context("Failed to run xdotool")?;
    if !output.status.success() {
        return Err(anyhow!("xdotool exited with {}", output.status));
    }
    parse_pid(&String::from_utf8_lossy(&output.stdout))
}

fn parse_pid(output: &str) -> Result<u32> {
    let pid = output.trim();
    pid.parse::<u32>()
        .with_context(|| format!("xdotool returned an invalid pid {pid:?}"))
}

impl FocusProvider for XdotoolFocusProvider {
    #[instrument(skip(self))]
    fn current_foreground_app(&mut self) -> Result<String> {
        let pid = focused_window_pid()?;
        self.resolver.resolve(pid)
    }
}
