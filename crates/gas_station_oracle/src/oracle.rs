use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::errors::OracleError;
use crate::types::{OperationResult, PostedTx, SimulatedBatch, UnsignedOp};

pub type OracleResult<T> = Result<T, OracleError>;

/// Thin abstraction over a remote chain node. Not responsible for batching,
/// policy, or persistence — it only simulates, broadcasts, and looks up.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// Side-effect-free dry run of `ops` in order. Fails with
    /// `SimulationFailed` if the node rejects any operation in the group.
    async fn simulate(&self, ops: &[UnsignedOp]) -> OracleResult<SimulatedBatch>;

    /// Broadcasts `ops` as a single bundled transaction. Returns as soon as
    /// the node accepts it for mempool inclusion.
    async fn submit(&self, ops: &[UnsignedOp]) -> OracleResult<PostedTx>;

    /// Looks up a transaction hash in the last N blocks (N ~= 10).
    async fn find_operation(&self, hash: &str) -> OracleResult<Option<OperationResult>>;

    /// Seconds between blocks; read once at startup by callers.
    fn block_delay(&self) -> Duration;

    /// Confirms an on-chain deposit addressed to `vault_owner`, used by the
    /// (non-core) deposit-confirmation flow. Reuses `find_operation`.
    async fn confirm_deposit(
        &self,
        hash: &str,
        from: &str,
        amount: i64,
    ) -> OracleResult<bool>;

    /// Confirms a withdrawal transaction landed, used by the (non-core)
    /// withdraw flow. Reuses `find_operation`.
    async fn confirm_withdraw(&self, hash: &str) -> OracleResult<bool>;
}
