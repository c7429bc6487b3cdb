use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("chain rejected the operation during simulation: {0}")]
    SimulationFailed(String),
    #[error("failed to submit batch: {0}")]
    SubmitFailed(String),
    #[error("operation not found in the last N blocks")]
    NotFound,
}
