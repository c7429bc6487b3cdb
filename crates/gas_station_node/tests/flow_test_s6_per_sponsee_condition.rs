//! S6: a `MaxCallsPerSponsee` condition caps one sender's calls against a
//! contract without affecting a different sender.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use common::{app, contract, entrypoint, expect_resolve, operation_body, post, state};
use gas_station_ledger::MockCreditLedger;
use gas_station_oracle::{BalanceUpdate, LandedOp, MockChainOracle, OperationResult, PostedTx, SimulatedBatch, SimulatedOp};
use gas_station_types::{Condition, CreditVault};
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn per_sponsee_cap_only_blocks_the_capped_sender() {
    const SENDER_X: &str = "tz1X";
    const SENDER_Y: &str = "tz1Y";

    let contract_id = Uuid::new_v4();
    let contract = contract(contract_id, -1);
    let entrypoint = entrypoint(Uuid::new_v4(), contract_id, true);
    let vault_id = Uuid::new_v4();
    let owner_id = contract.owner_sponsor_id;
    let created_at = Utc::now();

    let condition = Condition::MaxCallsPerSponsee {
        id: Uuid::new_v4(),
        contract_id,
        vault_id,
        max: 1,
        current: 0,
        created_at,
        is_active: true,
    };

    // Tracks how many Operation rows have been recorded per sender so
    // `count_sponsee_calls_since` reflects reality as calls land.
    let calls_by_sender: Arc<Mutex<HashMap<String, i64>>> = Arc::new(Mutex::new(HashMap::new()));

    let mut ledger = MockCreditLedger::new();
    expect_resolve(&mut ledger, &contract, &entrypoint);
    ledger.expect_active_max_calls_per_entrypoint().returning(|_, _| Ok(None));
    {
        let condition = condition.clone();
        ledger.expect_active_max_calls_per_sponsee().returning(move |_| Ok(Some(condition.clone())));
    }
    {
        let calls_by_sender = calls_by_sender.clone();
        ledger.expect_count_sponsee_calls_since().returning(move |sender, _, _| {
            Ok(*calls_by_sender.lock().unwrap().get(sender).unwrap_or(&0))
        });
    }
    ledger
        .expect_get_vault_by_contract()
        .returning(move |_| Ok(CreditVault { id: vault_id, owner_sponsor_id: owner_id, amount: 1_000_000 }));
    ledger.expect_debit_vault().returning(move |id, _| Ok(CreditVault { id, owner_sponsor_id: owner_id, amount: 999_990 }));
    {
        let calls_by_sender = calls_by_sender.clone();
        ledger.expect_record_operation().returning(move |op| {
            *calls_by_sender.lock().unwrap().entry(op.sender_address).or_insert(0) += 1;
            Ok(Uuid::new_v4())
        });
    }

    let mut oracle = MockChainOracle::new();
    oracle.expect_block_delay().returning(|| Duration::from_secs(1));
    oracle.expect_simulate().returning({
        let destination = contract.address.clone();
        move |_| {
            Ok(SimulatedBatch {
                contents: vec![SimulatedOp { destination: destination.clone(), estimated_fee: 10 }],
            })
        }
    });
    oracle.expect_submit().returning(|_| Ok(PostedTx { hash: "0xsponsee".to_string() }));
    oracle.expect_find_operation().returning({
        let destination = contract.address.clone();
        move |_| {
            Ok(Some(OperationResult {
                hash: "0xsponsee".to_string(),
                contents: vec![LandedOp {
                    destination: destination.clone(),
                    balance_updates: vec![BalanceUpdate { contract: common::RELAYER.to_string(), change: -10 }],
                }],
            }))
        }
    });

    let router = app(state(oracle, ledger));

    // First call from tz1X: the condition's live count is still 0, so it is
    // admitted, batched and lands.
    let body = operation_body(SENDER_X, &contract.address, &entrypoint.name);
    let first = tokio::spawn({
        let router = router.clone();
        async move { post(router, "/operation", body).await }
    });
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    common::drain_background_tasks().await;

    // Second call from tz1X: the live count is now 1, equal to the cap.
    let body = operation_body(SENDER_X, &contract.address, &entrypoint.name);
    let (status, json) = post(router.clone(), "/operation", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "condition_exceeded");

    // A different sender is unaffected by tz1X's cap.
    let body = operation_body(SENDER_Y, &contract.address, &entrypoint.name);
    let second = tokio::spawn({
        let router = router.clone();
        async move { post(router, "/operation", body).await }
    });
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let (status, _) = second.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}
