//! Boots the gas station relayer: loads config, wires the Credit Ledger,
//! Scheduler (with its Reconciler) and Admission API together, then serves
//! HTTP until the process is asked to stop.

mod config;
mod fake_oracle;

use std::collections::HashSet;
use std::sync::Arc;

use apollo_config::dumping::SerializeConfig;
use apollo_config::loading::load_and_process_config;
use clap::Command;
use config::GasStationConfig;
use fake_oracle::FakeChainOracle;
use gas_station_gateway::{AppState, GatewayServer, NoopSignatureVerifier};
use gas_station_ledger::{CreditLedger, SqlxCreditLedger};
use gas_station_oracle::ChainOracle;
use gas_station_scheduler::Scheduler;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = load_config()?;
    info!("starting gas station node on {}:{}", config.gateway.ip, config.gateway.port);

    let ledger = SqlxCreditLedger::connect(&config.gateway.database_url).await?;
    ledger.run_migrations().await?;
    let ledger: Arc<dyn CreditLedger> = Arc::new(ledger);

    // Out of core scope per spec.md §1: a real chain-client `ChainOracle` is
    // the caller's responsibility to supply. This fake keeps the service
    // runnable end to end without one.
    let oracle: Arc<dyn ChainOracle> = Arc::new(FakeChainOracle::default());

    let scheduler =
        Scheduler::spawn(oracle.clone(), ledger.clone(), config.gateway.relayer_address.clone(), config.scheduler);

    let app_state = AppState { ledger, oracle, scheduler, signature_verifier: Arc::new(NoopSignatureVerifier) };
    let server = GatewayServer::new(config.gateway, app_state);
    server.run().await?;
    Ok(())
}

/// Dumps the default config to a throwaway file, then feeds it through
/// `apollo_config`'s loader so CLI args and environment variables (in that
/// priority order) can still override any field, the way `original_source`'s
/// `config.py` reads `TEZOS_RPC`/`SECRET_KEY`/`LEVEL` from the environment.
fn load_config() -> anyhow::Result<GasStationConfig> {
    let dir = tempfile::tempdir()?;
    let schema_path = dir.path().join("gas_station_config.json");
    GasStationConfig::default().dump_to_file(&vec![], &HashSet::new(), schema_path.to_str().unwrap())?;

    let config = load_and_process_config::<GasStationConfig>(
        std::fs::File::open(&schema_path)?,
        Command::new("gas_station_node"),
        std::env::args().collect(),
        false,
    )?;
    Ok(config)
}
