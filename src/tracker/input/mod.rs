//! Input events and the sources that deliver them.
//! [GenericEventSource] picks the OS listener the crate was built with.

#[cfg(feature = "input")]
pub mod listener;

use std::sync::Arc;

use anyhow::Result;

use super::{accumulator::Accumulator, chord::Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Middle,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyPress {
        key: Key,
        /// Character the keyboard layout produced for this press, if any.
        symbol: Option<char>,
    },
    KeyRelease {
        key: Key,
    },
    ButtonPress(Button),
    ButtonRelease(Button),
    PointerMove {
        x: f64,
        y: f64,
    },
    Scroll {
        dx: f64,
        dy: f64,
    },
}

/// Producer of input events. Implementations deliver events from their own threads straight
/// into the accumulator and keep doing so for the lifetime of the process.
pub trait EventSource: Send {
    fn start(self: Box<Self>, sink: Arc<Accumulator>) -> Result<()>;
}

/// Serves as the default [EventSource] for the current build.
pub struct GenericEventSource;

impl EventSource for GenericEventSource {
    fn start(self: Box<Self>, sink: Arc<Accumulator>) -> Result<()> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "input")] {
                listener::spawn_listener(sink)
            } else {
                let _ = sink;
                Err(anyhow::anyhow!(
                    "keeptrack was built without the `input` feature, no input events can be observed"
                ))
            }
        }
    }
}

/// Feeds a fixed list of events from a background thread.
#[cfg(test)]
pub struct ScriptedEventSource {
    events: Vec<InputEvent>,
}

#[cfg(test)]
impl ScriptedEventSource {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
impl EventSource for ScriptedEventSource {
    fn start(self: Box<Self>, sink: Arc<Accumulator>) -> Result<()> {
        std::thread::Builder::new()
            .name("scripted-input".into())
            .spawn(move || {
                for event in self.events {
                    sink.record(event);
                }
            })?;
        Ok(())
    }
}
