//! S1: a single sponsored call, admitted, batched, submitted and
//! reconciled end to end through the real router and scheduler.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use common::{app, contract, entrypoint, expect_resolve, operation_body, post, state};
use gas_station_ledger::MockCreditLedger;
use gas_station_oracle::{BalanceUpdate, LandedOp, MockChainOracle, OperationResult, PostedTx, SimulatedBatch, SimulatedOp};
use gas_station_types::CreditVault;
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn happy_single_call_lands_and_reconciles() {
    let contract_id = Uuid::new_v4();
    let contract = contract(contract_id, -1);
    let entrypoint = entrypoint(Uuid::new_v4(), contract_id, true);
    let vault_amount = Arc::new(Mutex::new(1_000_000i64));

    let mut ledger = MockCreditLedger::new();
    expect_resolve(&mut ledger, &contract, &entrypoint);
    ledger.expect_active_max_calls_per_entrypoint().returning(|_, _| Ok(None));
    ledger.expect_active_max_calls_per_sponsee().returning(|_| Ok(None));
    let vault_id = Uuid::new_v4();
    let owner_id = contract.owner_sponsor_id;
    {
        let vault_amount = vault_amount.clone();
        ledger.expect_get_vault_by_contract().returning(move |_| {
            Ok(CreditVault { id: vault_id, owner_sponsor_id: owner_id, amount: *vault_amount.lock().unwrap() as u64 })
        });
    }
    ledger.expect_record_operation().returning(|_| Ok(Uuid::new_v4()));
    {
        let vault_amount = vault_amount.clone();
        ledger.expect_debit_vault().returning(move |id, delta| {
            let mut amount = vault_amount.lock().unwrap();
            *amount -= delta;
            Ok(CreditVault { id, owner_sponsor_id: owner_id, amount: *amount as u64 })
        });
    }

    let mut oracle = MockChainOracle::new();
    oracle.expect_block_delay().returning(|| Duration::from_secs(1));
    oracle.expect_simulate().returning({
        let destination = contract.address.clone();
        move |_| {
            Ok(SimulatedBatch {
                contents: vec![SimulatedOp { destination: destination.clone(), estimated_fee: 1234 }],
            })
        }
    });
    oracle.expect_submit().returning(|_| Ok(PostedTx { hash: "0xabc".to_string() }));
    oracle.expect_find_operation().returning({
        let destination = contract.address.clone();
        move |_| {
            Ok(Some(OperationResult {
                hash: "0xabc".to_string(),
                contents: vec![LandedOp {
                    destination: destination.clone(),
                    balance_updates: vec![BalanceUpdate { contract: common::RELAYER.to_string(), change: -1234 }],
                }],
            }))
        }
    });

    let router = app(state(oracle, ledger));

    let body = operation_body("tz1A", &contract.address, &entrypoint.name);
    let request = tokio::spawn(async move { post(router, "/operation", body).await });

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;

    let (status, json) = request.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "ok");
    assert_eq!(json["txHash"], "0xabc");

    common::drain_background_tasks().await;
    assert_eq!(*vault_amount.lock().unwrap(), 1_000_000 - 1234);
}
