//! Per-run counters shared by every executor of a run.
//!
//! Executors accumulate locally and publish once per chunk, so contention stays at one atomic
//! add per counter per chunk.
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunCounters {
    /// Count of start values tested.
    tested: AtomicU64,
    /// Sum of fused stopping steps over every tested value.
    total_steps: AtomicU64,
    /// Count of chunks that ran to completion.
    chunks: AtomicU64,
    /// Count of bands whose chunks all completed.
    bands: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the totals of one finished chunk.
    pub fn complete_chunk(&self, tested: u64, total_steps: u64) {
        self.tested.fetch_add(tested, Ordering::Relaxed);
        self.total_steps.fetch_add(total_steps, Ordering::Relaxed);
        self.chunks.fetch_add(1, Ordering::Release);
    }

    pub fn complete_band(&self) {
        self.bands.fetch_add(1, Ordering::Release);
    }

    pub fn tested(&self) -> u64 {
        self.tested.load(Ordering::Relaxed)
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps.load(Ordering::Relaxed)
    }

    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::Acquire)
    }

    pub fn bands(&self) -> u64 {
        self.bands.load(Ordering::Acquire)
    }
}
