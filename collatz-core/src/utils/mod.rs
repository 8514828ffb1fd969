pub mod counters;
pub mod errors;
pub mod math;
