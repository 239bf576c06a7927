//! Timing harness comparing alternative polars strategies for the same table
//! operation: copying a column into a `Vec`, remapping codes through a lookup
//! table and selecting rows by value.

pub mod candidates;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod harness;
pub mod io;
pub mod observability;
pub mod report;
pub mod runner;

pub use errors::{BenchError, BenchResult};
