use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gas_station_oracle::{
    BalanceUpdate,
    ChainOracle,
    LandedOp,
    OperationResult,
    OracleResult,
    PostedTx,
    SimulatedBatch,
    SimulatedOp,
    UnsignedOp,
};
use uuid::Uuid;

/// Stand-in `ChainOracle` for running the node without a real chain node
/// behind it. A concrete RPC-backed implementation is out of core scope per
/// spec.md §1 ("treated as a remote oracle"); this one estimates a flat fee
/// per operation and immediately "lands" whatever it submits, so the
/// Scheduler and Reconciler have something to drive against end to end.
pub struct FakeChainOracle {
    flat_fee: i64,
    block_delay: Duration,
    landed: Mutex<HashMap<String, OperationResult>>,
}

impl FakeChainOracle {
    pub fn new(flat_fee: i64, block_delay: Duration) -> Self {
        Self { flat_fee, block_delay, landed: Mutex::new(HashMap::new()) }
    }
}

impl Default for FakeChainOracle {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15))
    }
}

#[async_trait]
impl ChainOracle for FakeChainOracle {
    async fn simulate(&self, ops: &[UnsignedOp]) -> OracleResult<SimulatedBatch> {
        Ok(SimulatedBatch {
            contents: ops
                .iter()
                .map(|op| SimulatedOp { destination: op.destination.clone(), estimated_fee: self.flat_fee })
                .collect(),
        })
    }

    async fn submit(&self, ops: &[UnsignedOp]) -> OracleResult<PostedTx> {
        let hash = format!("op{}", Uuid::new_v4().simple());
        let contents = ops
            .iter()
            .map(|op| LandedOp {
                destination: op.destination.clone(),
                balance_updates: vec![BalanceUpdate { contract: op.destination.clone(), change: -self.flat_fee }],
            })
            .collect();
        self.landed
            .lock()
            .expect("lock poisoned")
            .insert(hash.clone(), OperationResult { hash: hash.clone(), contents });
        Ok(PostedTx { hash })
    }

    async fn find_operation(&self, hash: &str) -> OracleResult<Option<OperationResult>> {
        Ok(self.landed.lock().expect("lock poisoned").get(hash).cloned())
    }

    fn block_delay(&self) -> Duration {
        self.block_delay
    }

    async fn confirm_deposit(&self, hash: &str, _from: &str, _amount: i64) -> OracleResult<bool> {
        Ok(self.find_operation(hash).await?.is_some())
    }

    async fn confirm_withdraw(&self, hash: &str) -> OracleResult<bool> {
        Ok(self.find_operation(hash).await?.is_some())
    }
}
