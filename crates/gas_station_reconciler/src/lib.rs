//! Fee Reconciler (C5). Spawned once per successfully submitted batch (see
//! `gas_station_scheduler`), runs independently of the Scheduler, and never
//! reports back to it — failures are logged and swallowed, grounded
//! bit-for-bit on `original_source/src/tezos_manager.py::update_fees`'s
//! `while nb_try < 4: ... await asyncio.sleep(self.block_time)` retry loop.

use std::collections::HashMap;
use std::time::Duration;

use gas_station_ledger::CreditLedger;
use gas_station_oracle::{ChainOracle, LandedOp};
use gas_station_types::is_implicit_account;
use tracing::{debug, error, info, instrument, warn};

/// Runs the full reconciliation flow for one posted transaction: polls for
/// the landed result, extracts the relayer's own balance changes, groups
/// them by destination contract, and debits the owning vaults. Intended to
/// be `tokio::spawn`ed fire-and-forget by the Scheduler immediately after a
/// successful `submit` (§4.4 step 7); never awaited by its caller.
#[instrument(skip(oracle, ledger), fields(tx_hash = %tx_hash))]
pub async fn reconcile_batch(
    oracle: &dyn ChainOracle,
    ledger: &dyn CreditLedger,
    tx_hash: &str,
    relayer_address: &str,
    max_retries: usize,
    poll_interval: Duration,
) {
    let Some(result) = poll_for_landed(oracle, tx_hash, max_retries, poll_interval).await else {
        warn!("reconciler abandoned tx {tx_hash} after {max_retries} polls without landing");
        return;
    };

    let fees_by_destination = group_fees_by_destination(&result.contents, relayer_address);
    for (destination, fee) in fees_by_destination {
        if is_implicit_account(&destination) {
            debug!("skipping withdrawal destination {destination}, no vault debit");
            continue;
        }
        if fee <= 0 {
            continue;
        }
        match ledger.get_vault_by_contract(&destination).await {
            Ok(vault) => {
                if let Err(err) = ledger.debit_vault(vault.id, fee).await {
                    error!("failed to debit vault {} for {destination}: {err}", vault.id);
                }
            }
            Err(err) => {
                error!("no vault found for destination {destination}, dropping fee {fee}: {err}");
            }
        }
    }
    info!("reconciliation of tx {tx_hash} complete");
}

async fn poll_for_landed(
    oracle: &dyn ChainOracle,
    tx_hash: &str,
    max_retries: usize,
    poll_interval: Duration,
) -> Option<gas_station_oracle::OperationResult> {
    for attempt in 0..max_retries {
        match oracle.find_operation(tx_hash).await {
            Ok(Some(result)) => return Some(result),
            Ok(None) => {
                debug!("tx {tx_hash} not yet landed, attempt {}/{}", attempt + 1, max_retries);
            }
            Err(err) => {
                warn!("find_operation error for {tx_hash}, attempt {}/{}: {err}", attempt + 1, max_retries);
            }
        }
        if attempt + 1 < max_retries {
            tokio::time::sleep(poll_interval).await;
        }
    }
    None
}

/// Extracts every balance-update entry belonging to the relayer and sums
/// the absolute fee per owning operation's destination contract (§4.5
/// steps 2-3).
fn group_fees_by_destination(contents: &[LandedOp], relayer_address: &str) -> HashMap<String, i64> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for op in contents {
        for update in &op.balance_updates {
            if update.contract != relayer_address {
                continue;
            }
            // change is negative when the relayer pays out; the fee owed by
            // this destination is the absolute value.
            *totals.entry(op.destination.clone()).or_insert(0) += update.change.unsigned_abs() as i64;
        }
    }
    totals
}
