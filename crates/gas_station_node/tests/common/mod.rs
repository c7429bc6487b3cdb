//! Fixtures shared by the `flow_test_*` scenario tests. Builds the real
//! `Scheduler` coordinator and the real `GatewayServer` router on top of
//! mocked `CreditLedger`/`ChainOracle` collaborators, so each scenario
//! drives the whole admission pipeline end to end rather than one component
//! in isolation.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use gas_station_gateway::{AppState, GatewayServer, NoopSignatureVerifier};
use gas_station_gateway_config::GatewayConfig;
use gas_station_ledger::{CreditLedger, MockCreditLedger};
use gas_station_oracle::{ChainOracle, MockChainOracle};
use gas_station_scheduler::Scheduler;
use gas_station_scheduler_config::SchedulerConfig;
use gas_station_types::{Contract, Entrypoint};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

pub const RELAYER: &str = "tz1relayer";

pub fn contract(id: Uuid, max_calls_per_month: i64) -> Contract {
    Contract {
        id,
        address: "KT1widget".to_string(),
        owner_sponsor_id: Uuid::new_v4(),
        vault_id: Uuid::new_v4(),
        name: "widget".to_string(),
        max_calls_per_month,
    }
}

pub fn entrypoint(id: Uuid, contract_id: Uuid, is_enabled: bool) -> Entrypoint {
    Entrypoint { id, contract_id, name: "mint".to_string(), is_enabled }
}

/// Wires `get_contract_by_address`/`get_entrypoint` to resolve the same
/// `(contract, entrypoint)` pair for every call the pipeline makes.
pub fn expect_resolve(ledger: &mut MockCreditLedger, contract: &Contract, entrypoint: &Entrypoint) {
    let c = contract.clone();
    ledger.expect_get_contract_by_address().returning(move |_| Ok(c.clone()));
    let e = entrypoint.clone();
    ledger.expect_get_entrypoint().returning(move |_, _| Ok(e.clone()));
}

/// Builds the `AppState` the node binary itself assembles in `main.rs`:
/// a live `Scheduler` coordinator task backed by the given mocks.
pub fn state(oracle: MockChainOracle, ledger: MockCreditLedger) -> AppState {
    let oracle: Arc<dyn ChainOracle> = Arc::new(oracle);
    let ledger: Arc<dyn CreditLedger> = Arc::new(ledger);
    let scheduler =
        Scheduler::spawn(oracle.clone(), ledger.clone(), RELAYER.to_string(), SchedulerConfig::default());
    AppState { ledger, oracle, scheduler, signature_verifier: Arc::new(NoopSignatureVerifier) }
}

pub fn app(state: AppState) -> Router {
    GatewayServer::new(GatewayConfig::default(), state).app()
}

pub fn operation_body(sender: &str, destination: &str, entrypoint: &str) -> serde_json::Value {
    serde_json::json!({
        "senderAddress": sender,
        "operations": [{
            "destination": destination,
            "parameters": { "entrypoint": entrypoint, "value": {} }
        }]
    })
}

pub async fn post(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Lets every task spawned so far (the coordinator's `flush_tick`, the
/// reconciler it fires off) run to quiescence. Nothing left in these flows
/// awaits a real timer beyond the block-delay tick, so a handful of
/// cooperative yields is enough to drain them under a paused clock.
pub async fn drain_background_tasks() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
