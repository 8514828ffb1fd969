use std::time::{Duration, Instant};

use common::config::{CalculatorConfig, OverflowPolicy};
use common::constants::{MIN_POWER, TRIVIAL_PROVEN_BOUND};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::{
    partition::{bands, validate_power, Band, Chunk},
    proof_mask::{ProofMask, ProofMaskActor},
    recurrence,
    sink::TrajectoryWriter,
    utils::{counters::RunCounters, errors::CollatzError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    Sequential,
    Concurrent,
}

/// Totals of one full-range run.
///
/// `tested` and `total_steps` do not depend on scheduling, so a sequential and a concurrent run
/// over the same `to_power` must agree on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub to_power: u32,
    pub mode: RunMode,
    pub bands: u64,
    pub chunks: u64,
    pub tested: u64,
    pub total_steps: u64,
    pub elapsed: Duration,
}

/// Tests every odd integer below `2^(to_power - 1)` band by band, either on the calling thread
/// or spread over a bounded worker pool.
///
/// Completed band bounds feed a [`ProofMask`] that lives as long as the calculator.
pub struct CollatzCalculator {
    config: CalculatorConfig,
    pool: ThreadPool,
    proof_mask: ProofMaskActor,
    sink: Option<TrajectoryWriter>,
}

impl CollatzCalculator {
    pub fn new(config: CalculatorConfig) -> Result<Self, CollatzError> {
        config.validate().map_err(CollatzError::InvalidArgument)?;

        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("collatz-worker-{index}"));
        if let Some(threads) = config.max_parallelism {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        let proof_mask = ProofMaskActor::spawn(Self::seed_mask(), &config.proof_mask)?;

        tracing::debug!(threads = pool.current_num_threads(), "collatz calculator ready");
        Ok(Self {
            config,
            pool,
            proof_mask,
            sink: None,
        })
    }

    /// Attaches a trajectory sink. Trajectories are written only when
    /// `emit_trajectories` is set.
    pub fn with_sink(mut self, sink: TrajectoryWriter) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn seed_mask() -> ProofMask {
        let mut mask = ProofMask::new();
        mask.record(TRIVIAL_PROVEN_BOUND);
        mask
    }

    /// Walks the bands in order on the calling thread.
    #[tracing::instrument(skip(self), name = "CollatzCalculator::test_sequentially")]
    pub fn test_sequentially(&self, to_power: u32) -> Result<RunSummary, CollatzError> {
        let counters = RunCounters::new();
        let start = Instant::now();

        for band in bands(to_power)? {
            self.execute_chunk(band.as_chunk(), &counters)?;
            self.complete_band(&band, &counters)?;
        }

        Ok(self.summarize(to_power, RunMode::Sequential, &counters, start.elapsed()))
    }

    /// Dispatches every band onto the pool at once. Each band then fans out into its chunks.
    #[tracing::instrument(skip(self), name = "CollatzCalculator::test_concurrently")]
    pub fn test_concurrently(&self, to_power: u32) -> Result<RunSummary, CollatzError> {
        validate_power(to_power)?;
        let counters = RunCounters::new();
        let start = Instant::now();

        self.pool.install(|| {
            (MIN_POWER..to_power)
                .into_par_iter()
                .map(Band::new)
                .try_for_each(|band| self.split_band(band, &counters))
        })?;

        Ok(self.summarize(to_power, RunMode::Concurrent, &counters, start.elapsed()))
    }

    /// Cuts `band` into chunks, runs them all and blocks until the last one finishes.
    ///
    /// Must run inside the pool: the nested parallel iterator is what bounds the fan-out.
    #[tracing::instrument(skip_all, name = "CollatzCalculator::split_band", fields(band = band.index))]
    fn split_band(&self, band: Band, counters: &RunCounters) -> Result<(), CollatzError> {
        let chunks: Vec<Chunk> = band.chunks(&self.config.partition).collect();
        chunks
            .into_par_iter()
            .try_for_each(|chunk| self.execute_chunk(chunk, counters))?;
        self.complete_band(&band, counters)
    }

    fn complete_band(&self, band: &Band, counters: &RunCounters) -> Result<(), CollatzError> {
        counters.complete_band();
        tracing::debug!(band = band.index, stop = band.stop, "band complete");
        self.proof_mask.record(band.stop)
    }

    /// Tests every odd value of `chunk` and publishes the chunk's totals to `counters`.
    pub fn execute_chunk(&self, chunk: Chunk, counters: &RunCounters) -> Result<(), CollatzError> {
        match self.config.overflow {
            OverflowPolicy::Wrap => self.run_chunk(
                chunk,
                counters,
                |n| Ok(recurrence::test(n)),
                |n, out| {
                    recurrence::test_and_print(n, out);
                    Ok(())
                },
            ),
            OverflowPolicy::Fault => self.run_chunk(
                chunk,
                counters,
                recurrence::try_test,
                recurrence::try_test_and_print,
            ),
        }
    }

    #[inline]
    fn run_chunk<T, R>(
        &self,
        chunk: Chunk,
        counters: &RunCounters,
        tester: T,
        render: R,
    ) -> Result<(), CollatzError>
    where
        T: Fn(u64) -> Result<u64, CollatzError>,
        R: Fn(u64, &mut String) -> Result<(), CollatzError>,
    {
        let mut tested = 0u64;
        let mut total_steps = 0u64;

        match self.trajectory_output() {
            None => {
                for n in chunk.odd_values() {
                    total_steps += tester(n)?;
                    tested += 1;
                }
            }
            Some(sink) => {
                let gate = if self.config.gate_output_by_proof_mask {
                    Some(self.proof_mask.snapshot()?)
                } else {
                    None
                };
                let batch_bytes = sink.config().batch_bytes;
                let mut batch = String::new();
                for n in chunk.odd_values() {
                    total_steps += tester(n)?;
                    tested += 1;
                    if gate.is_some_and(|mask| mask.has_proven(n)) {
                        continue;
                    }
                    render(n, &mut batch)?;
                    if batch.len() >= batch_bytes {
                        sink.send_batch(std::mem::take(&mut batch))?;
                    }
                }
                sink.send_batch(batch)?;
            }
        }

        counters.complete_chunk(tested, total_steps);
        Ok(())
    }

    fn trajectory_output(&self) -> Option<&TrajectoryWriter> {
        self.sink.as_ref().filter(|_| self.config.emit_trajectories)
    }

    fn summarize(
        &self,
        to_power: u32,
        mode: RunMode,
        counters: &RunCounters,
        elapsed: Duration,
    ) -> RunSummary {
        let summary = RunSummary {
            to_power,
            mode,
            bands: counters.bands(),
            chunks: counters.chunks(),
            tested: counters.tested(),
            total_steps: counters.total_steps(),
            elapsed,
        };
        tracing::info!(
            %mode,
            to_power,
            tested = summary.tested,
            chunks = summary.chunks,
            elapsed_ms = elapsed.as_millis() as u64,
            "run complete"
        );
        summary
    }

    /// Stopping time of a single value under the configured overflow policy.
    pub fn test(&self, n: u64) -> Result<u64, CollatzError> {
        match self.config.overflow {
            OverflowPolicy::Wrap => Ok(recurrence::test(n)),
            OverflowPolicy::Fault => recurrence::try_test(n),
        }
    }

    /// Writes the trajectory of `n` to the attached sink under the configured overflow policy.
    pub fn test_and_print(&self, n: u64) -> Result<(), CollatzError> {
        let sink = self.sink.as_ref().ok_or_else(|| {
            CollatzError::InvalidArgument("no trajectory sink attached".to_string())
        })?;
        let line = match self.config.overflow {
            OverflowPolicy::Wrap => recurrence::trajectory(n),
            OverflowPolicy::Fault => {
                let mut line = String::new();
                recurrence::try_test_and_print(n, &mut line)?;
                line
            }
        };
        sink.send_batch(line)
    }

    /// Fused steps from `n` to 1 under the configured overflow policy.
    pub fn steps(&self, n: u64) -> Result<u64, CollatzError> {
        match self.config.overflow {
            OverflowPolicy::Wrap => Ok(recurrence::steps(n)),
            OverflowPolicy::Fault => recurrence::try_steps(n),
        }
    }

    /// Heuristic coverage check against the accumulated proof mask.
    ///
    /// Never consulted when deciding what to test.
    pub fn has_proven(&self, n: u64) -> Result<bool, CollatzError> {
        self.proof_mask.has_proven(n)
    }

    pub fn proof_mask(&self) -> Result<ProofMask, CollatzError> {
        self.proof_mask.snapshot()
    }

    /// Forgets every recorded band.
    pub fn reinitialize(&self) -> Result<(), CollatzError> {
        self.proof_mask.reset(Self::seed_mask())
    }

    /// Flushes and closes the sink, returning the bytes written to it.
    pub fn finish(mut self) -> Result<u64, CollatzError> {
        match self.sink.take() {
            Some(sink) => sink.finalize(),
            None => Ok(0),
        }
    }
}
