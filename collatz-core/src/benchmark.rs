//! Timed full-range runs with human-readable banners.
use std::time::{Duration, Instant};

use thousands::Separable;

use crate::{
    calculator::{CollatzCalculator, RunMode, RunSummary},
    partition::validate_power,
    utils::errors::CollatzError,
};

fn adverb(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Sequential => "Sequentially",
        RunMode::Concurrent => "Concurrently",
    }
}

/// `"Concurrently Calculating Collatz to 16,777,216 (2^24)..."`
pub fn start_banner(mode: RunMode, to_power: u32) -> String {
    let max = (1u128 << to_power).separate_with_commas();
    format!(
        "{} Calculating Collatz to {max} (2^{to_power})...",
        adverb(mode)
    )
}

/// `"Concurrently Calculated Collatz to 16,777,216 (2^24) in 9.5ms"`
pub fn done_banner(mode: RunMode, to_power: u32, elapsed: Duration) -> String {
    let max = (1u128 << to_power).separate_with_commas();
    format!(
        "{} Calculated Collatz to {max} (2^{to_power}) in {elapsed:?}",
        adverb(mode)
    )
}

pub fn benchmark_sequential(
    calculator: &CollatzCalculator,
    to_power: u32,
) -> Result<RunSummary, CollatzError> {
    benchmark(calculator, to_power, RunMode::Sequential)
}

pub fn benchmark_concurrent(
    calculator: &CollatzCalculator,
    to_power: u32,
) -> Result<RunSummary, CollatzError> {
    benchmark(calculator, to_power, RunMode::Concurrent)
}

fn benchmark(
    calculator: &CollatzCalculator,
    to_power: u32,
    mode: RunMode,
) -> Result<RunSummary, CollatzError> {
    validate_power(to_power)?;
    println!("{}\n", start_banner(mode, to_power));
    let start = Instant::now();
    let summary = match mode {
        RunMode::Sequential => calculator.test_sequentially(to_power)?,
        RunMode::Concurrent => calculator.test_concurrently(to_power)?,
    };
    println!("{}\n", done_banner(mode, to_power, start.elapsed()));
    Ok(summary)
}
