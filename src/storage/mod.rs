//! The log is a single CSV file inside the log directory:
//!  - The first row names the columns.
//!  - Every flush appends one row describing the interval that just ended.
//!  - Rows are never rewritten; readers merge them.

pub mod log_store;
pub mod record;
