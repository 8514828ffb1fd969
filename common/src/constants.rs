/// Smallest `toPower` accepted by the drivers. Powers below this produce no bands.
pub const MIN_POWER: u32 = 2;
/// Largest `toPower` representable with `u64` band bounds.
pub const MAX_POWER: u32 = 64;

/// Upper bound of the trivially proven prefix. 1 and 2 reach 1 without testing,
/// so band testing starts at 3.
pub const TRIVIAL_PROVEN_BOUND: u64 = 2;

// Tuned on a 12-core / 24-thread Ryzen 3900X.
pub const DEFAULT_CHUNK_DIVISOR: u64 = 14;
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 10_000;
/// Upper limit for `min_chunk_size`. Bands are at most 2^62 wide.
pub const MAX_MIN_CHUNK_SIZE: u64 = 1 << 63;

pub const DEFAULT_SINK_CHANNEL_DEPTH: usize = 64;
pub const DEFAULT_SINK_WRITE_BUFFER_SIZE: usize = 1 << 20;
pub const DEFAULT_SINK_BATCH_BYTES: usize = 1 << 16;

pub const DEFAULT_PROOF_MASK_CHANNEL_DEPTH: usize = 1024;
