use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum GcrError {
    /// A scenario parameter is out of range or options are inconsistent.
    /// Reported at construction; the run never starts.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A state invariant failed after a completed tick. This indicates a
    /// bug in the engine, not a recoverable condition; the run is aborted
    /// at the tick boundary.
    #[error("invariant violated at tick {tick}: {cause}")]
    InvariantViolation { tick: usize, cause: String },
}

/// Convenience type for `Result<T, GcrError>`.
pub type GcrResult<T> = Result<T, GcrError>;
