use common::config::PartitionConfig;
use common::constants::{MAX_POWER, MIN_POWER};

use crate::utils::{errors::CollatzError, math::Math};

/// A half-open run `[start, stop)` of integers whose odd members one executor tests.
///
/// `start` is always odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: u64,
    pub stop: u64,
}

impl Chunk {
    pub fn new(start: u64, stop: u64) -> Self {
        debug_assert!(start & 1 == 1, "chunk must start on an odd value, got {start}");
        Self { start, stop }
    }

    /// The odd values of the chunk, ascending.
    pub fn odd_values(&self) -> impl Iterator<Item = u64> {
        (self.start..self.stop).step_by(2)
    }

    pub fn num_odd_values(&self) -> u64 {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start).div_ceil(2)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }
}

/// The `index`-th power-of-two band: `[2^(index-1) + 1, 2^index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub index: u32,
    pub start: u64,
    pub stop: u64,
}

impl Band {
    pub(crate) fn new(index: u32) -> Self {
        assert!(
            (MIN_POWER..MAX_POWER).contains(&index),
            "band index {index} out of range"
        );
        Self {
            index,
            start: (index - 1).pow2() + 1,
            stop: index.pow2(),
        }
    }

    /// The whole band as a single chunk, starting at its first odd value.
    pub fn as_chunk(&self) -> Chunk {
        Chunk::new(self.start | 1, self.stop)
    }

    /// Splits the band into chunks sized by `config`.
    pub fn chunks(&self, config: &PartitionConfig) -> Chunks {
        split_range(self.start, self.stop, config)
    }
}

/// Checks that `to_power` yields band bounds representable in `u64`.
pub fn validate_power(to_power: u32) -> Result<(), CollatzError> {
    if (MIN_POWER..=MAX_POWER).contains(&to_power) {
        Ok(())
    } else {
        Err(CollatzError::InvalidArgument(format!(
            "toPower must be within {MIN_POWER}..={MAX_POWER}, got {to_power}"
        )))
    }
}

/// Bands `2 ..= to_power - 1`, generated lazily.
pub fn bands(to_power: u32) -> Result<impl Iterator<Item = Band>, CollatzError> {
    validate_power(to_power)?;
    Ok((MIN_POWER..to_power).map(Band::new))
}

/// `max(width / chunk_divisor, min_chunk_size)`, rounded up to an even stride so that every
/// chunk of an odd-aligned range also starts odd.
///
/// A size that saturates at `u64::MAX` stays odd, but it already spans any range in one chunk.
pub fn chunk_size(width: u64, config: &PartitionConfig) -> u64 {
    let size = (width / config.chunk_divisor)
        .max(config.min_chunk_size)
        .max(1);
    size.saturating_add(size & 1)
}

/// Partitions `[start | 1, stop)` into consecutive chunks. The last chunk is clipped to `stop`.
pub fn split_range(start: u64, stop: u64, config: &PartitionConfig) -> Chunks {
    let start = start | 1;
    let size = chunk_size(stop.saturating_sub(start), config);
    Chunks {
        cursor: start,
        stop,
        size,
    }
}

/// Iterator over the chunks of one range.
#[derive(Debug, Clone)]
pub struct Chunks {
    cursor: u64,
    stop: u64,
    size: u64,
}

impl Chunks {
    pub fn chunk_size(&self) -> u64 {
        self.size
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.cursor >= self.stop {
            return None;
        }
        let start = self.cursor;
        let stop = match start.checked_add(self.size) {
            Some(end) if end < self.stop => end,
            _ => self.stop,
        };
        self.cursor = stop;
        Some(Chunk::new(start, stop))
    }
}
