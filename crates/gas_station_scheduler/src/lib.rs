//! Batch Scheduler (C4): the single coordinator that owns `pending` and
//! `results` exclusively (§4.4). No other component writes them; admission
//! handlers talk to it only through the enqueue channel.

pub mod errors;

pub use errors::SchedulerError;

use std::sync::Arc;
use std::time::Duration;

use gas_station_oracle::{ChainOracle, UnsignedOp};
use gas_station_scheduler_config::SchedulerConfig;
use gas_station_types::ChainAddress;
use indexmap::IndexMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, instrument, warn, Instrument};

type EnqueueReply = oneshot::Sender<Result<String, SchedulerError>>;

enum Command {
    Enqueue { sender: ChainAddress, op: UnsignedOp, reply: EnqueueReply },
}

struct PendingSlot {
    op: UnsignedOp,
    reply: EnqueueReply,
}

/// Handle to the running coordinator task. Cheap to clone (holds only an
/// mpsc sender); admission handlers enqueue through this and suspend until
/// their slot resolves.
#[derive(Clone)]
pub struct Scheduler {
    inbox: mpsc::Sender<Command>,
}

impl Scheduler {
    /// Spawns the coordinator loop exactly once, the way `Batcher`'s
    /// component task is started by its `ComponentStarter` impl. `oracle`
    /// and `ledger` are shared with every Reconciler the coordinator spawns.
    pub fn spawn(
        oracle: Arc<dyn ChainOracle>,
        ledger: Arc<dyn gas_station_ledger::CreditLedger>,
        relayer_address: ChainAddress,
        config: SchedulerConfig,
    ) -> Self {
        let (inbox, rx) = mpsc::channel(config.inbox_buffer_size);
        tokio::spawn(
            run_coordinator(rx, oracle, ledger, relayer_address, config)
                .instrument(info_span!("gas_station_scheduler_coordinator")),
        );
        Self { inbox }
    }

    /// Enqueue protocol of §4.4: sets the sender's slot to waiting (via the
    /// coordinator), then suspends until the next tick (or a later one, if
    /// re-enqueued) resolves it. A second call for the same sender while the
    /// first is still waiting overwrites the pending op and reply in place
    /// — the first caller's wait then resolves with `Cancelled` once its
    /// reply channel is dropped.
    #[instrument(skip(self, op), fields(sender = %sender))]
    pub async fn enqueue(&self, sender: ChainAddress, op: UnsignedOp) -> Result<String, SchedulerError> {
        let (reply, reply_rx) = oneshot::channel();
        self.inbox
            .send(Command::Enqueue { sender, op, reply })
            .await
            .map_err(|_| SchedulerError::NotRunning)?;
        reply_rx.await.map_err(|_| SchedulerError::Cancelled)
    }
}

async fn run_coordinator(
    mut rx: mpsc::Receiver<Command>,
    oracle: Arc<dyn ChainOracle>,
    ledger: Arc<dyn gas_station_ledger::CreditLedger>,
    relayer_address: ChainAddress,
    config: SchedulerConfig,
) {
    let block_delay = if config.block_delay_override_millis.is_zero() {
        oracle.block_delay()
    } else {
        config.block_delay_override_millis
    };
    let mut ticker = tokio::time::interval(block_delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut pending: IndexMap<ChainAddress, PendingSlot> = IndexMap::new();

    loop {
        tokio::select! {
            command = rx.recv() => {
                match command {
                    Some(Command::Enqueue { sender, op, reply }) => {
                        // IndexMap::insert on an existing key overwrites the
                        // value in place without moving its position — this
                        // is exactly "overwrites value but not position".
                        pending.insert(sender, PendingSlot { op, reply });
                    }
                    None => {
                        info!("scheduler inbox closed, shutting down coordinator");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                flush_tick(&mut pending, &oracle, &ledger, &relayer_address, &config).await;
            }
        }
    }
}

#[instrument(skip(pending, oracle, ledger, config))]
async fn flush_tick(
    pending: &mut IndexMap<ChainAddress, PendingSlot>,
    oracle: &Arc<dyn ChainOracle>,
    ledger: &Arc<dyn gas_station_ledger::CreditLedger>,
    relayer_address: &str,
    config: &SchedulerConfig,
) {
    if pending.is_empty() {
        return;
    }

    let candidates: Vec<(ChainAddress, PendingSlot)> = pending.drain(..).collect();
    let mut accepted: Vec<(ChainAddress, UnsignedOp, EnqueueReply)> = Vec::with_capacity(candidates.len());

    for (sender, slot) in candidates {
        accepted.push((sender, slot.op, slot.reply));
        let ops: Vec<UnsignedOp> = accepted.iter().map(|(_, op, _)| op.clone()).collect();
        if let Err(err) = oracle.simulate(&ops).await {
            let (rejected_sender, _, reply) = accepted.pop().expect("just pushed this element");
            warn!("simulation rejected sender {rejected_sender}: {err}");
            let _ = reply.send(Err(SchedulerError::Conflict));
        }
    }

    if accepted.is_empty() {
        return;
    }

    let ops: Vec<UnsignedOp> = accepted.iter().map(|(_, op, _)| op.clone()).collect();
    match oracle.submit(&ops).await {
        Ok(posted) => {
            info!("submitted batch of {} operation(s) as {}", accepted.len(), posted.hash);
            for (_, _, reply) in accepted {
                let _ = reply.send(Ok(posted.hash.clone()));
            }
            spawn_reconciler(oracle.clone(), ledger.clone(), posted.hash, relayer_address.to_string(), config);
        }
        Err(err) => {
            error!("submit failed, failing entire batch: {err}");
            for (_, _, reply) in accepted {
                let _ = reply.send(Err(SchedulerError::Conflict));
            }
        }
    }
}

fn spawn_reconciler(
    oracle: Arc<dyn ChainOracle>,
    ledger: Arc<dyn gas_station_ledger::CreditLedger>,
    tx_hash: String,
    relayer_address: String,
    config: &SchedulerConfig,
) {
    let max_retries = config.reconciler_max_retries;
    let poll_interval = if config.block_delay_override_millis.is_zero() {
        oracle.block_delay()
    } else {
        config.block_delay_override_millis
    };
    let span = info_span!("reconciler", tx_hash = %tx_hash);
    tokio::spawn(
        async move {
            gas_station_reconciler::reconcile_batch(
                oracle.as_ref(),
                ledger.as_ref(),
                &tx_hash,
                &relayer_address,
                max_retries,
                poll_interval,
            )
            .await;
        }
        .instrument(span),
    );
}
