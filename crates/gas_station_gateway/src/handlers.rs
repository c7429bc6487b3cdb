//! HTTP handlers of §6. Each is a thin adapter: decode the body, call into
//! the Ledger/Policy/Oracle/Scheduler, encode the result. `#[instrument]` on
//! every handler matches the density of `apollo_http_server::http_server`'s
//! `add_rpc_tx`/`add_tx`.

use axum::extract::{Path, State};
use axum::Json;
use gas_station_ledger::{NewCondition, NewContract, NewEntrypoint, RecordedOperation};
use gas_station_oracle::UnsignedOp;
use gas_station_policy::SimulatedDestination;
use gas_station_types::{
    is_implicit_account,
    ChainAddress,
    Condition,
    Contract,
    ContractId,
    CreditVault,
    Entrypoint,
    GasStationError,
    OperationStatus,
    Sponsor,
    SponsorId,
    VaultId,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dto::*;
use crate::errors::{GatewayError, GatewayResult};
use crate::state::AppState;

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

#[instrument(skip(state))]
pub async fn create_sponsor(
    State(state): State<AppState>,
    Json(body): Json<CreateSponsorBody>,
) -> GatewayResult<Json<Sponsor>> {
    let sponsor = state.ledger.create_sponsor(&body.name, &body.chain_address).await?;
    Ok(Json(sponsor))
}

#[instrument(skip(state))]
pub async fn create_contract(
    State(state): State<AppState>,
    Json(body): Json<CreateContractBody>,
) -> GatewayResult<Json<Contract>> {
    let new_contract = NewContract {
        address: body.address,
        owner_sponsor_id: body.owner_id,
        name: body.name,
        vault_id: body.vault_id,
        max_calls_per_month: body.max_calls_per_month,
        entrypoints: body
            .entrypoints
            .into_iter()
            .map(|e| NewEntrypoint { name: e.name, is_enabled: e.is_enabled })
            .collect(),
    };
    let contract = state.ledger.create_contract(new_contract).await?;
    Ok(Json(contract))
}

#[instrument(skip(state))]
pub async fn update_entrypoints(
    State(state): State<AppState>,
    Json(body): Json<Vec<UpdateEntrypointBody>>,
) -> GatewayResult<Json<Vec<Entrypoint>>> {
    let updates: Vec<(Uuid, bool)> = body.into_iter().map(|u| (u.id, u.is_enabled)).collect();
    let entrypoints = state.ledger.update_entrypoints(&updates).await?;
    Ok(Json(entrypoints))
}

#[instrument(skip(state))]
pub async fn deposit(
    State(state): State<AppState>,
    Json(body): Json<DepositBody>,
) -> GatewayResult<Json<CreditVault>> {
    let owner = state.ledger.get_sponsor(body.owner_id).await?;
    let confirmed =
        state.oracle.confirm_deposit(&body.operation_hash, &owner.chain_address, body.amount).await?;
    if !confirmed {
        return Err(GatewayError(GasStationError::OperationNotFound));
    }
    let vault = state.ledger.credit_vault(body.vault_id, body.amount).await?;
    Ok(Json(vault))
}

#[instrument(skip(state, body), fields(vault_id = %body.vault_id))]
pub async fn withdraw(
    State(state): State<AppState>,
    Json(body): Json<WithdrawBody>,
) -> GatewayResult<Json<WithdrawResponse>> {
    let vault = state.ledger.get_vault(body.vault_id).await?;
    let sponsor = state.ledger.get_sponsor(vault.owner_sponsor_id).await?;
    if body.withdraw_counter != sponsor.withdraw_counter {
        return Err(GatewayError(GasStationError::BadWithdrawCounter));
    }
    let message = withdraw_message(body.vault_id, body.withdraw_counter, body.amount);
    if !state.signature_verifier.verify(&sponsor.chain_address, &message, &body.signature).await {
        return Err(GatewayError(GasStationError::InvalidSignature));
    }
    state.ledger.debit_vault(body.vault_id, body.amount).await?;
    let withdraw_op = UnsignedOp {
        destination: sponsor.chain_address.clone(),
        entrypoint: "transfer".to_string(),
        value: serde_json::json!({ "amount": body.amount }),
    };
    let posted = state.oracle.submit(std::slice::from_ref(&withdraw_op)).await?;
    let next_counter = body.withdraw_counter + 1;
    state.ledger.record_withdraw_counter(sponsor.id, next_counter).await?;
    Ok(Json(WithdrawResponse { tx_hash: posted.hash, counter: next_counter }))
}

/// Packs `(vaultId, counter, amount)` the way §6's "Withdraw signature"
/// describes; the chain's canonical binary serialisation of this triple is
/// out of core scope (see `SignatureVerifier`), so this is a stable,
/// human-readable stand-in a real verifier can replace.
fn withdraw_message(vault_id: VaultId, counter: u64, amount: i64) -> Vec<u8> {
    format!("{vault_id}:{counter}:{amount}").into_bytes()
}

#[instrument(skip(state, body), fields(sender = %body.sender_address))]
pub async fn submit_operation(
    State(state): State<AppState>,
    Json(body): Json<OperationBody>,
) -> GatewayResult<Json<OperationResponse>> {
    let hash = run_operation_pipeline(&state, &body.sender_address, body.operations).await?;
    Ok(Json(OperationResponse { result: "ok", tx_hash: hash }))
}

#[instrument(skip(state, body), fields(sender = %body.operation.sender_address))]
pub async fn submit_signed_operation(
    State(state): State<AppState>,
    Json(body): Json<SignedOperationBody>,
) -> GatewayResult<Json<OperationResponse>> {
    let message = serde_json::to_vec(&body.operation.operations.iter().map(|op| &op.destination).collect::<Vec<_>>())
        .map_err(|e| GatewayError(GasStationError::InternalError(e.to_string())))?;
    if !state.signature_verifier.verify(&body.sender_key, &message, &body.signature).await {
        return Err(GatewayError(GasStationError::InvalidSignature));
    }
    let hash =
        run_operation_pipeline(&state, &body.operation.sender_address, body.operation.operations).await?;
    Ok(Json(OperationResponse { result: "ok", tx_hash: hash }))
}

struct ResolvedOp {
    contract: Contract,
    entrypoint: Entrypoint,
    unsigned: UnsignedOp,
}

/// The pipeline of spec.md §4.6 steps 1-6. `sub_ops` is the literal wire
/// shape (a sender may submit several destinations in one call); each is
/// policy-checked individually (step 2) and simulated together (step 3,
/// `Oracle.simulate` takes the whole group), but the Scheduler batches at
/// the granularity of one chain operation per sender slot (§4.4:
/// `pending[sender] = simulatedOp`, singular) — so each validated sub-op is
/// enqueued in turn under the same sender address. The common case tested
/// in §8 (S1-S6) is exactly one sub-op per call, where this collapses to a
/// single enqueue-and-wait.
async fn run_operation_pipeline(
    state: &AppState,
    sender_address: &str,
    sub_ops: Vec<SubOperationBody>,
) -> GatewayResult<String> {
    if sub_ops.is_empty() {
        return Err(GatewayError(GasStationError::EmptyOperationList));
    }

    let mut resolved = Vec::with_capacity(sub_ops.len());
    for sub in sub_ops {
        if is_implicit_account(&sub.destination) {
            return Err(GatewayError(GasStationError::InvalidAddress(sub.destination)));
        }
        let contract = state.ledger.get_contract_by_address(&sub.destination).await?;
        let entrypoint =
            state.ledger.get_entrypoint(contract.id, &sub.parameters.entrypoint).await?;
        gas_station_policy::check_pre_simulation(
            state.ledger.as_ref(),
            &contract,
            &entrypoint,
            sender_address,
        )
        .await?;
        let unsigned = UnsignedOp {
            destination: sub.destination,
            entrypoint: sub.parameters.entrypoint,
            value: sub.parameters.value,
        };
        resolved.push(ResolvedOp { contract, entrypoint, unsigned });
    }

    let ops: Vec<UnsignedOp> = resolved.iter().map(|r| r.unsigned.clone()).collect();
    let simulated = state.oracle.simulate(&ops).await?;

    for r in &resolved {
        let destination = SimulatedDestination {
            contract_address: r.contract.address.clone(),
            estimated_fee: simulated.estimated_fee_for(&r.contract.address),
        };
        gas_station_policy::check_post_simulation_funds(state.ledger.as_ref(), &destination).await?;
        gas_station_policy::check_monthly_cap(state.ledger.as_ref(), &r.contract).await?;
    }

    let mut last_hash = String::new();
    for r in resolved {
        let increment_condition = state
            .ledger
            .active_max_calls_per_entrypoint(r.contract.id, r.entrypoint.id)
            .await?
            .map(|c| match c {
                Condition::MaxCallsPerEntrypoint { id, .. } => id,
                Condition::MaxCallsPerSponsee { .. } => {
                    unreachable!("active_max_calls_per_entrypoint never returns this variant")
                }
            });

        match state.scheduler.enqueue(sender_address.to_string(), r.unsigned).await {
            Ok(hash) => {
                last_hash = hash.clone();
                state
                    .ledger
                    .record_operation(RecordedOperation {
                        sender_address: sender_address.to_string(),
                        contract_id: r.contract.id,
                        entrypoint_id: r.entrypoint.id,
                        tx_hash: hash,
                        status: OperationStatus::Ok,
                        increment_condition,
                    })
                    .await?;
            }
            Err(err) => {
                let _ = state
                    .ledger
                    .record_operation(RecordedOperation {
                        sender_address: sender_address.to_string(),
                        contract_id: r.contract.id,
                        entrypoint_id: r.entrypoint.id,
                        tx_hash: String::new(),
                        status: OperationStatus::Failing,
                        increment_condition: None,
                    })
                    .await;
                return Err(GatewayError::from(err));
            }
        }
    }
    Ok(last_hash)
}

#[instrument(skip(state))]
pub async fn create_condition(
    State(state): State<AppState>,
    Json(body): Json<NewConditionBody>,
) -> GatewayResult<Json<Condition>> {
    let new_condition = match body {
        NewConditionBody::MaxCallsPerEntrypoint { contract_id, entrypoint_id, vault_id, max } => {
            NewCondition::MaxCallsPerEntrypoint { contract_id, entrypoint_id, vault_id, max }
        }
        NewConditionBody::MaxCallsPerSponsee { contract_id, vault_id, max } => {
            NewCondition::MaxCallsPerSponsee { contract_id, vault_id, max }
        }
    };
    let condition = state.ledger.create_condition(new_condition).await?;
    Ok(Json(condition))
}

#[instrument(skip(state))]
pub async fn update_max_calls(
    State(state): State<AppState>,
    Path(contract_id): Path<ContractId>,
    Json(body): Json<UpdateMaxCallsBody>,
) -> GatewayResult<Json<Contract>> {
    let contract = state.ledger.update_max_calls_per_month(contract_id, body.max_calls).await?;
    Ok(Json(contract))
}

#[instrument(skip(state))]
pub async fn list_conditions_for_vault(
    State(state): State<AppState>,
    Path(vault_id): Path<VaultId>,
) -> GatewayResult<Json<Vec<Condition>>> {
    let conditions = state.ledger.list_conditions_for_vault(vault_id).await?;
    Ok(Json(conditions))
}

// --- typed lookups (supplemental, SPEC_FULL.md §6) ---

#[instrument(skip(state))]
pub async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<ContractId>,
) -> GatewayResult<Json<Contract>> {
    Ok(Json(state.ledger.get_contract(contract_id).await?))
}

#[instrument(skip(state))]
pub async fn get_contract_by_address(
    State(state): State<AppState>,
    Path(address): Path<ChainAddress>,
) -> GatewayResult<Json<Contract>> {
    Ok(Json(state.ledger.get_contract_by_address(&address).await?))
}

#[instrument(skip(state))]
pub async fn list_contracts_for_sponsor(
    State(state): State<AppState>,
    Path(sponsor_id): Path<SponsorId>,
) -> GatewayResult<Json<Vec<Contract>>> {
    Ok(Json(state.ledger.list_contracts_for_sponsor(sponsor_id).await?))
}

#[instrument(skip(state))]
pub async fn list_entrypoints(
    State(state): State<AppState>,
    Path(contract_id): Path<ContractId>,
) -> GatewayResult<Json<Vec<Entrypoint>>> {
    Ok(Json(state.ledger.list_entrypoints(contract_id).await?))
}

#[instrument(skip(state))]
pub async fn get_entrypoint(
    State(state): State<AppState>,
    Path((contract_id, name)): Path<(ContractId, String)>,
) -> GatewayResult<Json<Entrypoint>> {
    Ok(Json(state.ledger.get_entrypoint(contract_id, &name).await?))
}

#[instrument(skip(state))]
pub async fn get_vault(
    State(state): State<AppState>,
    Path(vault_id): Path<VaultId>,
) -> GatewayResult<Json<CreditVault>> {
    Ok(Json(state.ledger.get_vault(vault_id).await?))
}

#[instrument(skip(state))]
pub async fn get_vault_by_contract_address(
    State(state): State<AppState>,
    Path(address): Path<ChainAddress>,
) -> GatewayResult<Json<CreditVault>> {
    Ok(Json(state.ledger.get_vault_by_contract(&address).await?))
}

#[instrument(skip(state))]
pub async fn list_vaults_for_sponsor(
    State(state): State<AppState>,
    Path(sponsor_id): Path<SponsorId>,
) -> GatewayResult<Json<Vec<CreditVault>>> {
    Ok(Json(state.ledger.list_vaults_for_sponsor(sponsor_id).await?))
}
