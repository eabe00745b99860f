//! Debugger errors

use evmsim_chain::ChainError;
use thiserror::Error;

/// Errors surfaced to the code driving a debugging session
#[derive(Debug, Error)]
pub enum DebugError {
    /// The worker thread has exited; no further jobs run
    #[error("debug worker stopped")]
    WorkerStopped,

    /// The worker thread could not be started
    #[error("failed to spawn debug worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The job was rejected before or around execution
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for debugger operations
pub type DebugResult<T> = Result<T, DebugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DebugError::WorkerStopped.to_string(), "debug worker stopped");
        let chain = DebugError::from(ChainError::Validation("bad address".into()));
        assert_eq!(chain.to_string(), "validation error: bad address");
    }
}
