use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::constants::{
    DEFAULT_CHUNK_DIVISOR, DEFAULT_MIN_CHUNK_SIZE, DEFAULT_PROOF_MASK_CHANNEL_DEPTH,
    DEFAULT_SINK_BATCH_BYTES, DEFAULT_SINK_CHANNEL_DEPTH, DEFAULT_SINK_WRITE_BUFFER_SIZE,
    MAX_MIN_CHUNK_SIZE,
};

/// How the Sequence Tester treats `u64` overflow of the fused odd step.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OverflowPolicy {
    /// Two's-complement wraparound, as unchecked `u64` arithmetic behaves in release builds.
    #[default]
    Wrap,
    /// Abort the run with a `NumericOverflow` error.
    Fault,
}

/// Controls how a band is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Target number of chunks per band. Chunk size is `band_width / chunk_divisor`.
    pub chunk_divisor: u64,
    /// Chunk size never drops below this many integers.
    pub min_chunk_size: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            chunk_divisor: DEFAULT_CHUNK_DIVISOR,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

/// Configuration for the trajectory sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Depth of the channel (number of batches that can be queued)
    pub channel_depth: usize,
    /// Buffer size for the file writer (in bytes)
    pub write_buffer_size: usize,
    /// Executors flush their local buffer to the channel past this many bytes
    pub batch_bytes: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel_depth: DEFAULT_SINK_CHANNEL_DEPTH,
            write_buffer_size: DEFAULT_SINK_WRITE_BUFFER_SIZE,
            batch_bytes: DEFAULT_SINK_BATCH_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofMaskConfig {
    /// Number of pending updates the mask actor buffers before senders block.
    pub channel_depth: usize,
}

impl Default for ProofMaskConfig {
    fn default() -> Self {
        Self {
            channel_depth: DEFAULT_PROOF_MASK_CHANNEL_DEPTH,
        }
    }
}

/// Everything a `CollatzCalculator` needs besides `toPower`.
///
/// Every field has a default, so a TOML file only needs the keys it overrides:
///
/// ```toml
/// max_parallelism = 8
/// overflow = "fault"
///
/// [partition]
/// chunk_divisor = 24
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub partition: PartitionConfig,
    /// Worker threads in the pool. `None` uses one per logical CPU.
    pub max_parallelism: Option<usize>,
    pub overflow: OverflowPolicy,
    /// Render every tested trajectory to the attached sink.
    pub emit_trajectories: bool,
    /// Suppress trajectories of values the proof mask already claims. Testing is unaffected.
    pub gate_output_by_proof_mask: bool,
    pub sink: SinkConfig,
    pub proof_mask: ProofMaskConfig,
}

impl CalculatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.partition.chunk_divisor == 0 {
            return Err("partition.chunk_divisor must be at least 1".to_string());
        }
        if !(1..=MAX_MIN_CHUNK_SIZE).contains(&self.partition.min_chunk_size) {
            return Err(format!(
                "partition.min_chunk_size must be within 1..={MAX_MIN_CHUNK_SIZE}"
            ));
        }
        if self.max_parallelism == Some(0) {
            return Err("max_parallelism must be at least 1".to_string());
        }
        if self.sink.channel_depth == 0 || self.proof_mask.channel_depth == 0 {
            return Err("channel depths must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn with_max_parallelism(mut self, threads: usize) -> Self {
        self.max_parallelism = Some(threads);
        self
    }

    pub fn with_partition(mut self, chunk_divisor: u64, min_chunk_size: u64) -> Self {
        self.partition = PartitionConfig {
            chunk_divisor,
            min_chunk_size,
        };
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_trajectories(mut self, emit: bool) -> Self {
        self.emit_trajectories = emit;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(CalculatorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_divisor_rejected() {
        let config = CalculatorConfig::default().with_partition(0, 10);
        assert!(config.validate().is_err());
        let config = CalculatorConfig::default().with_partition(14, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_chunk_floor_rejected() {
        let config = CalculatorConfig::default().with_partition(14, u64::MAX);
        assert!(config.validate().is_err());
        let config = CalculatorConfig::default().with_partition(14, MAX_MIN_CHUNK_SIZE);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_threads_rejected() {
        let config = CalculatorConfig::default().with_max_parallelism(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn overflow_policy_parses() {
        assert_eq!(OverflowPolicy::from_str("wrap"), Ok(OverflowPolicy::Wrap));
        assert_eq!(OverflowPolicy::from_str("Fault"), Ok(OverflowPolicy::Fault));
        assert!(OverflowPolicy::from_str("saturate").is_err());
        assert_eq!(OverflowPolicy::Fault.to_string(), "fault");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: CalculatorConfig =
            serde_json::from_str(r#"{"overflow":"fault","partition":{"chunk_divisor":24}}"#)
                .unwrap();
        assert_eq!(config.overflow, OverflowPolicy::Fault);
        assert_eq!(config.partition.chunk_divisor, 24);
        assert_eq!(config.partition.min_chunk_size, DEFAULT_MIN_CHUNK_SIZE);
        assert_eq!(config.sink, SinkConfig::default());
    }
}
