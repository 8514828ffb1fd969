use std::{fs, path::Path, path::PathBuf};

use clap::Args;
use common::config::{CalculatorConfig, OverflowPolicy};
use eyre::{Result, WrapErr};

/// Calculator settings shared by every subcommand. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML file with calculator settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads (defaults to one per logical CPU)
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Target number of chunks per band
    #[arg(long, global = true)]
    pub chunk_divisor: Option<u64>,

    /// Smallest chunk handed to a worker
    #[arg(long, global = true)]
    pub min_chunk_size: Option<u64>,

    /// Overflow handling for the fused odd step: wrap or fault
    #[arg(long, global = true)]
    pub overflow: Option<OverflowPolicy>,

    /// Only write trajectories the proof mask does not already claim
    #[arg(long, global = true)]
    pub gate_output: bool,
}

impl ConfigArgs {
    /// Reads the config file, if any, and applies the flag overrides on top.
    pub fn resolve(&self) -> Result<CalculatorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => CalculatorConfig::default(),
        };
        self.apply(&mut config);
        config.validate().map_err(|e| eyre::eyre!(e))?;
        Ok(config)
    }

    fn apply(&self, config: &mut CalculatorConfig) {
        if let Some(threads) = self.threads {
            config.max_parallelism = Some(threads);
        }
        if let Some(divisor) = self.chunk_divisor {
            config.partition.chunk_divisor = divisor;
        }
        if let Some(min_chunk_size) = self.min_chunk_size {
            config.partition.min_chunk_size = min_chunk_size;
        }
        if let Some(overflow) = self.overflow {
            config.overflow = overflow;
        }
        if self.gate_output {
            config.gate_output_by_proof_mask = true;
        }
    }
}

pub fn load_config(path: &Path) -> Result<CalculatorConfig> {
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&contents).wrap_err_with(|| format!("invalid config file {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<CalculatorConfig> {
    Ok(toml_edit::de::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use common::constants::{DEFAULT_CHUNK_DIVISOR, DEFAULT_MIN_CHUNK_SIZE};

    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), CalculatorConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            max_parallelism = 8
            overflow = "fault"

            [partition]
            min_chunk_size = 2048

            [sink]
            batch_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.max_parallelism, Some(8));
        assert_eq!(config.overflow, OverflowPolicy::Fault);
        assert_eq!(config.partition.chunk_divisor, DEFAULT_CHUNK_DIVISOR);
        assert_eq!(config.partition.min_chunk_size, 2048);
        assert_eq!(config.sink.batch_bytes, 4096);
        assert!(!config.emit_trajectories);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse_config(r#"overflow = "saturate""#).is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collatz.toml");
        fs::write(&path, "max_parallelism = 8\n[partition]\nchunk_divisor = 7\n").unwrap();

        let args = ConfigArgs {
            config: Some(path),
            threads: Some(2),
            overflow: Some(OverflowPolicy::Fault),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.max_parallelism, Some(2));
        assert_eq!(config.partition.chunk_divisor, 7);
        assert_eq!(config.partition.min_chunk_size, DEFAULT_MIN_CHUNK_SIZE);
        assert_eq!(config.overflow, OverflowPolicy::Fault);
    }

    #[test]
    fn invalid_overrides_fail_validation() {
        let args = ConfigArgs {
            chunk_divisor: Some(0),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/collatz.toml")),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/collatz.toml"));
    }
}
