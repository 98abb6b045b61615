pub mod csv;
pub mod operations;
