//! Exhaustive Collatz verification over power-of-two bands, sequentially or on a bounded
//! worker pool.

pub mod benchmark;
pub mod calculator;
pub mod partition;
pub mod proof_mask;
pub mod recurrence;
pub mod sink;
pub mod utils;

pub use calculator::{CollatzCalculator, RunMode, RunSummary};
pub use utils::errors::CollatzError;
