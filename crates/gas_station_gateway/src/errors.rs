use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gas_station_ledger::LedgerError;
use gas_station_oracle::OracleError;
use gas_station_policy::PolicyError;
use gas_station_scheduler::SchedulerError;
use gas_station_types::GasStationError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Local wrapper around `GasStationError` so `IntoResponse` can be
/// implemented here without violating the orphan rule (neither the error
/// type nor the trait live in this crate). Every fallible handler returns
/// `GatewayResult<T> = Result<T, GatewayError>`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct GatewayError(#[from] pub GasStationError);

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        GatewayError(ledger_error_to_taxonomy(err))
    }
}

impl From<PolicyError> for GatewayError {
    fn from(err: PolicyError) -> Self {
        GatewayError(policy_error_to_taxonomy(err))
    }
}

impl From<SchedulerError> for GatewayError {
    fn from(err: SchedulerError) -> Self {
        GatewayError(scheduler_error_to_taxonomy(err))
    }
}

impl From<OracleError> for GatewayError {
    fn from(err: OracleError) -> Self {
        GatewayError(oracle_error_to_taxonomy(err))
    }
}

fn ledger_error_to_taxonomy(err: LedgerError) -> GasStationError {
    match err {
        LedgerError::SponsorNotFound => GasStationError::SponsorNotFound,
        LedgerError::ContractNotFound => GasStationError::ContractNotFound,
        LedgerError::EntrypointNotFound => GasStationError::EntrypointNotFound,
        LedgerError::VaultNotFound => GasStationError::VaultNotFound,
        LedgerError::ConditionNotFound => GasStationError::ConditionNotFound,
        LedgerError::ContractAlreadyRegistered => GasStationError::ContractAlreadyRegistered,
        LedgerError::ConditionAlreadyExists => GasStationError::ConditionAlreadyExists,
        LedgerError::WouldGoNegative { amount, .. } => {
            GasStationError::NotEnoughFunds { estimated_fee: amount }
        }
        LedgerError::ConditionExceeded(_) => GasStationError::ConditionExceeded,
        LedgerError::Database(e) => GasStationError::InternalError(e.to_string()),
    }
}

fn policy_error_to_taxonomy(err: PolicyError) -> GasStationError {
    match err {
        PolicyError::EntrypointDisabled => GasStationError::EntrypointDisabled,
        PolicyError::TooManyCallsForThisMonth => GasStationError::TooManyCallsForThisMonth,
        PolicyError::ConditionExceeded(_) => GasStationError::ConditionExceeded,
        PolicyError::NotEnoughFunds { needed, .. } => {
            GasStationError::NotEnoughFunds { estimated_fee: needed }
        }
        // A check that couldn't run (e.g. a DB outage) is not a rejection;
        // it must surface as a 500, not a 403.
        PolicyError::LedgerFailure(e) => GasStationError::InternalError(e.to_string()),
    }
}

fn scheduler_error_to_taxonomy(err: SchedulerError) -> GasStationError {
    match err {
        SchedulerError::Conflict => GasStationError::BatchConflict,
        SchedulerError::Cancelled | SchedulerError::NotRunning => {
            GasStationError::InternalError(err.to_string())
        }
    }
}

fn oracle_error_to_taxonomy(err: OracleError) -> GasStationError {
    match err {
        OracleError::SimulationFailed(msg) => GasStationError::SimulationFailed(msg),
        OracleError::SubmitFailed(msg) => GasStationError::InternalError(msg),
        OracleError::NotFound => GasStationError::OperationNotFound,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code_class())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = error_kind(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {}", self.0);
        } else {
            debug!("rejecting request: {}", self.0);
        }
        let body = ErrorBody { kind, message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

fn error_kind(err: &GasStationError) -> &'static str {
    use GasStationError::*;
    match err {
        SponsorNotFound => "sponsor_not_found",
        ContractNotFound => "contract_not_found",
        EntrypointNotFound => "entrypoint_not_found",
        VaultNotFound => "vault_not_found",
        OperationNotFound => "operation_not_found",
        ConditionNotFound => "condition_not_found",
        ContractAlreadyRegistered => "contract_already_registered",
        ConditionAlreadyExists => "condition_already_exists",
        EntrypointDisabled => "entrypoint_disabled",
        NotEnoughFunds { .. } => "not_enough_funds",
        TooManyCallsForThisMonth => "too_many_calls_for_this_month",
        ConditionExceeded => "condition_exceeded",
        InvalidAddress(_) => "invalid_address",
        EmptyOperationList => "empty_operation_list",
        InvalidSignature => "invalid_signature",
        BadWithdrawCounter => "bad_withdraw_counter",
        SimulationFailed(_) => "simulation_failed",
        BatchConflict => "batch_conflict",
        InternalError(_) => "internal_error",
    }
}
