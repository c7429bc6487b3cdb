use thiserror::Error;

/// The full error taxonomy of the relayer, spanning Ledger, Policy,
/// Scheduler and Admission API failures. Crates closer to the core define
/// their own narrower error enums and convert into this one at the seam
/// the way a downstream client's error wraps into a gateway-facing error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GasStationError {
    #[error("sponsor not found")]
    SponsorNotFound,
    #[error("contract not found")]
    ContractNotFound,
    #[error("entrypoint not found")]
    EntrypointNotFound,
    #[error("vault not found")]
    VaultNotFound,
    #[error("operation not found")]
    OperationNotFound,
    #[error("condition not found")]
    ConditionNotFound,

    #[error("contract address already registered")]
    ContractAlreadyRegistered,
    #[error("an active condition of this kind already exists for this scope")]
    ConditionAlreadyExists,

    #[error("entrypoint is disabled")]
    EntrypointDisabled,
    #[error("vault does not have enough credit to cover the estimated fee of {estimated_fee}")]
    NotEnoughFunds { estimated_fee: i64 },
    #[error("contract has reached its monthly call cap")]
    TooManyCallsForThisMonth,
    #[error("sender has reached the per-sponsee call cap for this contract")]
    ConditionExceeded,

    #[error("destination address is not a contract address: {0}")]
    InvalidAddress(String),
    #[error("operation list must not be empty")]
    EmptyOperationList,
    #[error("signature does not match the declared sender")]
    InvalidSignature,
    #[error("withdraw counter does not match the sponsor's current counter")]
    BadWithdrawCounter,

    #[error("chain rejected the operation during simulation: {0}")]
    SimulationFailed(String),
    #[error("operation conflicted with an earlier operation in the same batch")]
    BatchConflict,

    #[error("internal error: {0}")]
    InternalError(String),
}

impl GasStationError {
    /// The HTTP status code this error maps to, per the relayer's error
    /// taxonomy. Lives here (not in the HTTP crate) so every caller of the
    /// core crates can reason about severity without an axum dependency.
    pub fn status_code_class(&self) -> u16 {
        use GasStationError::*;
        match self {
            SponsorNotFound
            | ContractNotFound
            | EntrypointNotFound
            | VaultNotFound
            | OperationNotFound
            | ConditionNotFound => 404,
            ContractAlreadyRegistered
            | ConditionAlreadyExists
            | EntrypointDisabled
            | NotEnoughFunds { .. }
            | TooManyCallsForThisMonth
            | ConditionExceeded => 403,
            InvalidAddress(_) | EmptyOperationList | InvalidSignature | BadWithdrawCounter
            | SimulationFailed(_) => 400,
            BatchConflict => 409,
            InternalError(_) => 500,
        }
    }
}
