use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollatzError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("u64 overflow while testing {start}: next term after {value} does not fit")]
    NumericOverflow { start: u64, value: u64 },
    #[error("Trajectory sink was closed before the run finished")]
    SinkClosed,
    #[error("Proof mask actor is no longer running")]
    ProofMaskClosed,
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
