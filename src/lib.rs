//! Personal activity logger. Counts key presses, chords, clicks, pointer travel, scrolling and
//! the focused application, and appends one CSV row per interval that can later be summarized
//! from the terminal.
//!

pub mod cli;
pub mod focus_api;
pub mod fs;
pub mod report;
pub mod storage;
pub mod tracker;
pub mod utils;
