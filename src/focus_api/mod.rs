//! Per-OS lookups of the application that currently has input focus.
//! [GenericFocusProvider] is the main artifact of this module that abstracts the backends.

pub mod process_tree;
#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;
#[cfg(unix)]
pub mod xdotool;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;

use crate::tracker::focus::FocusProvider;

/// Serves as a cross-compatible [FocusProvider] implementation.
pub struct GenericFocusProvider {
    inner: Box<dyn FocusProvider>,
}

impl GenericFocusProvider {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                Ok(Self {
                    inner: Box::new(win::WindowsFocusProvider::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                Ok(Self {
                    inner: Box::new(x11::X11FocusProvider::new()?),
                })
            }
            else if #[cfg(unix)] {
                Ok(Self {
                    inner: Box::new(xdotool::XdotoolFocusProvider::new()),
                })
            }
            else {
                Ok(Self {
                    inner: Box::new(UnsupportedFocusProvider),
                })
            }
        }
    }
}

impl FocusProvider for GenericFocusProvider {
    fn current_foreground_app(&mut self) -> Result<String> {
        self.inner.current_foreground_app()
    }
}

/// Used on platforms without a backend. Every sample falls back to the desktop label.
pub struct UnsupportedFocusProvider;

impl FocusProvider for UnsupportedFocusProvider {
    fn current_foreground_app(&mut self) -> Result<String> {
        Err(anyhow::anyhow!(
            "No focused window backend is available on this platform"
        ))
    }
}
