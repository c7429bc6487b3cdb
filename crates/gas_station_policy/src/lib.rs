//! Policy Engine (C2): the ordered admission checks of §4.2, run as plain
//! functions against a Credit Ledger snapshot. No background task, no
//! owned state — every call re-reads whatever it needs through
//! `&dyn CreditLedger`, the way `apollo_gateway`'s stateless validators are
//! invoked inline from the gateway's transaction pipeline rather than
//! living as separate components.

pub mod errors;

pub use errors::{PolicyError, PolicyResult};

use gas_station_ledger::CreditLedger;
use gas_station_types::{Condition, Contract, Entrypoint};

/// Destination contract plus the fee the Oracle estimated for it during
/// simulation; the shape the Policy Engine needs out of a `SimulatedBatch`
/// without depending on `gas_station_oracle` directly.
#[derive(Clone, Debug)]
pub struct SimulatedDestination {
    pub contract_address: String,
    pub estimated_fee: i64,
}

/// Checks 1-4: everything decidable before the Oracle is asked to simulate.
/// Called once per sub-operation while the Admission API is still building
/// the batch (§4.6 step 2).
pub async fn check_pre_simulation(
    ledger: &dyn CreditLedger,
    contract: &Contract,
    entrypoint: &Entrypoint,
    sender_address: &str,
) -> PolicyResult<()> {
    check_entrypoint_enabled(entrypoint)?;
    check_monthly_cap(ledger, contract).await?;
    check_max_calls_per_entrypoint(ledger, contract, entrypoint).await?;
    check_max_calls_per_sponsee(ledger, contract, sender_address).await?;
    Ok(())
}

/// Check 1: `entrypoint.isEnabled`.
pub fn check_entrypoint_enabled(entrypoint: &Entrypoint) -> PolicyResult<()> {
    if entrypoint.is_enabled {
        Ok(())
    } else {
        Err(PolicyError::EntrypointDisabled)
    }
}

/// Check 2: `countOperationsThisMonth(contract) < contract.maxCallsPerMonth`,
/// skipped entirely when the cap is unlimited (`-1`).
pub async fn check_monthly_cap(ledger: &dyn CreditLedger, contract: &Contract) -> PolicyResult<()> {
    if contract.monthly_cap_unlimited() {
        return Ok(());
    }
    let count = ledger.count_operations_this_month(contract.id).await?;
    if count < contract.max_calls_per_month {
        Ok(())
    } else {
        Err(PolicyError::TooManyCallsForThisMonth)
    }
}

/// Check 3: if an active `MaxCallsPerEntrypoint` condition governs this
/// `(contract, entrypoint)`, its `current < max`.
pub async fn check_max_calls_per_entrypoint(
    ledger: &dyn CreditLedger,
    contract: &Contract,
    entrypoint: &Entrypoint,
) -> PolicyResult<()> {
    let Some(condition) = ledger.active_max_calls_per_entrypoint(contract.id, entrypoint.id).await?
    else {
        return Ok(());
    };
    if condition.satisfied() {
        Ok(())
    } else {
        Err(PolicyError::ConditionExceeded(condition_id(&condition)))
    }
}

/// Check 4: if an active `MaxCallsPerSponsee` condition governs this
/// contract+vault, the number of Operation rows for this sender since the
/// condition's `createdAt` must be strictly less than `condition.max`. This
/// is re-derived from a live count every time rather than a stored counter
/// (unlike check 3), matching spec.md §4.2 step 4's literal wording.
pub async fn check_max_calls_per_sponsee(
    ledger: &dyn CreditLedger,
    contract: &Contract,
    sender_address: &str,
) -> PolicyResult<()> {
    let Some(condition) = ledger.active_max_calls_per_sponsee(contract.id).await? else {
        return Ok(());
    };
    let (max, created_at) = match condition {
        Condition::MaxCallsPerSponsee { max, created_at, .. } => (max, created_at),
        Condition::MaxCallsPerEntrypoint { .. } => unreachable!("active_max_calls_per_sponsee never returns this variant"),
    };
    let count = ledger.count_sponsee_calls_since(sender_address, contract.id, created_at).await?;
    if count < max {
        Ok(())
    } else {
        Err(PolicyError::ConditionExceeded(condition_id(&condition)))
    }
}

/// Check 5: after simulation, every destination's vault must hold at least
/// the simulated fee. Run once per destination in the simulated batch
/// (§4.6 step 4), not per sub-operation — a sender whose call fans out to
/// several destinations is checked against each.
pub async fn check_post_simulation_funds(
    ledger: &dyn CreditLedger,
    destination: &SimulatedDestination,
) -> PolicyResult<()> {
    let vault = ledger.get_vault_by_contract(&destination.contract_address).await?;
    if vault.amount as i64 >= destination.estimated_fee {
        Ok(())
    } else {
        Err(PolicyError::NotEnoughFunds {
            vault_id: vault.id,
            destination: destination.contract_address.clone(),
            needed: destination.estimated_fee,
        })
    }
}

fn condition_id(condition: &Condition) -> uuid::Uuid {
    match condition {
        Condition::MaxCallsPerEntrypoint { id, .. } | Condition::MaxCallsPerSponsee { id, .. } => *id,
    }
}
