//! Admission API (C6): the stateless HTTP wrapper of §4.6/§6. Holds no
//! state of its own beyond `AppState`'s cheap-to-clone handles; every
//! decision is delegated to the Policy Engine, Ledger, Oracle or Scheduler.

pub mod dto;
pub mod errors;
pub mod handlers;
pub mod state;

pub use errors::{GatewayError, GatewayResult};
pub use state::{AppState, NoopSignatureVerifier, SignatureVerifier};

use std::net::SocketAddr;

use axum::routing::{get, post, put};
use axum::Router;
use gas_station_gateway_config::GatewayConfig;
use tracing::info;

/// Owns the bind config and the assembled router, the way
/// `apollo_http_server::HttpServer` owns `HttpServerConfig` plus its
/// `AppState`.
pub struct GatewayServer {
    pub config: GatewayConfig,
    app_state: AppState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, app_state: AppState) -> Self {
        GatewayServer { config, app_state }
    }

    pub fn app(&self) -> Router {
        build_router(self.app_state.clone())
    }

    /// Binds and serves forever, the axum 0.8 way (`TcpListener` +
    /// `axum::serve`), mirroring `HttpServer::run`'s "runs forever" shape.
    pub async fn run(&self) -> std::io::Result<()> {
        let (ip, port) = self.config.ip_and_port();
        let addr = SocketAddr::new(ip, port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("gas station gateway listening on {addr}");
        axum::serve(listener, self.app()).await
    }
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/sponsors", post(handlers::create_sponsor))
        .route("/contracts", post(handlers::create_contract))
        .route("/entrypoints", put(handlers::update_entrypoints))
        .route("/deposit", put(handlers::deposit))
        .route("/withdraw", put(handlers::withdraw))
        .route("/operation", post(handlers::submit_operation))
        .route("/signed_operation", post(handlers::submit_signed_operation))
        .route("/condition", post(handlers::create_condition))
        .route("/contract/{id}/condition/max_calls", put(handlers::update_max_calls))
        .route("/condition/{vault_id}", get(handlers::list_conditions_for_vault))
        .route("/contracts/by-address/{address}", get(handlers::get_contract_by_address))
        .route("/contracts/{id}", get(handlers::get_contract))
        .route("/users/{id}/contracts", get(handlers::list_contracts_for_sponsor))
        .route("/entrypoints/{contract_id}/{name}", get(handlers::get_entrypoint))
        .route("/entrypoints/{contract_id}", get(handlers::list_entrypoints))
        .route("/credits/by-contract-address/{address}", get(handlers::get_vault_by_contract_address))
        .route("/credits/{id}", get(handlers::get_vault))
        .route("/users/{id}/credits", get(handlers::list_vaults_for_sponsor))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gas_station_ledger::MockCreditLedger;
    use gas_station_oracle::MockChainOracle;
    use gas_station_scheduler::Scheduler;
    use gas_station_scheduler_config::SchedulerConfig;
    use gas_station_types::Sponsor;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    fn test_state(oracle: MockChainOracle, ledger: MockCreditLedger) -> AppState {
        let oracle: Arc<dyn gas_station_oracle::ChainOracle> = Arc::new(oracle);
        let ledger: Arc<dyn gas_station_ledger::CreditLedger> = Arc::new(ledger);
        let scheduler = Scheduler::spawn(
            oracle.clone(),
            ledger.clone(),
            "tz1relayer".to_string(),
            SchedulerConfig::default(),
        );
        AppState { ledger, oracle, scheduler, signature_verifier: Arc::new(NoopSignatureVerifier) }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let state = test_state(MockChainOracle::new(), MockCreditLedger::new());
        let app = build_router(state);
        let response =
            app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, serde_json::to_vec(&dto::HealthBody { status: "ok" }).unwrap());
    }

    #[tokio::test]
    async fn create_sponsor_delegates_to_ledger() {
        let mut ledger = MockCreditLedger::new();
        let sponsor_id = Uuid::new_v4();
        ledger.expect_create_sponsor().returning(move |name, addr| {
            Ok(Sponsor {
                id: sponsor_id,
                name: name.to_string(),
                chain_address: addr.to_string(),
                withdraw_counter: 0,
            })
        });
        let state = test_state(MockChainOracle::new(), ledger);
        let app = build_router(state);

        let body = serde_json::json!({"name": "acme", "chainAddress": "tz1acme"});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sponsors")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_operation_list_is_rejected() {
        let state = test_state(MockChainOracle::new(), MockCreditLedger::new());
        let app = build_router(state);

        let body = serde_json::json!({"senderAddress": "tz1A", "operations": []});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/operation")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
