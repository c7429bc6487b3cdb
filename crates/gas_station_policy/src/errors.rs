use gas_station_ledger::LedgerError;
use thiserror::Error;
use uuid::Uuid;

/// Reason a sub-operation was rejected before it ever reaches the Scheduler,
/// or failed to be checked at all. Each rejection variant maps one-to-one
/// onto a spec.md §4.2 check, in the order they are evaluated; the engine
/// stops at the first that fails. `LedgerFailure` is not a rejection — it
/// means a check couldn't run, and must surface as a 500, not a 403.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("entrypoint is disabled")]
    EntrypointDisabled,
    #[error("monthly call cap reached for this contract")]
    TooManyCallsForThisMonth,
    #[error("condition {0} is at its cap")]
    ConditionExceeded(Uuid),
    #[error("vault {vault_id} has insufficient credit for destination {destination} (needs {needed})")]
    NotEnoughFunds { vault_id: Uuid, destination: String, needed: i64 },
    #[error(transparent)]
    LedgerFailure(#[from] LedgerError),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
