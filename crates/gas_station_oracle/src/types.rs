use gas_station_types::ChainAddress;
use serde::{Deserialize, Serialize};

/// One sub-operation of a call, as submitted by a sponsee: a destination
/// contract plus the entrypoint and parameters to invoke on it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnsignedOp {
    pub destination: ChainAddress,
    pub entrypoint: String,
    pub value: serde_json::Value,
}

/// Result of a node-side dry run of a batch: per-operation estimated fee and
/// destination, in submission order. Side-effect-free on the chain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulatedBatch {
    pub contents: Vec<SimulatedOp>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulatedOp {
    pub destination: ChainAddress,
    pub estimated_fee: i64,
}

impl SimulatedBatch {
    /// The estimated fee for a given destination, per spec §4.2 step 5. If a
    /// destination appears more than once in the batch the fees are summed.
    pub fn estimated_fee_for(&self, destination: &str) -> i64 {
        self.contents.iter().filter(|op| op.destination == destination).map(|op| op.estimated_fee).sum()
    }
}

/// A broadcast transaction accepted by the node for mempool inclusion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PostedTx {
    pub hash: String,
}

/// A balance change reported against one account in a landed operation's
/// metadata. `change` is signed: negative means the account (typically the
/// relayer) paid out.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BalanceUpdate {
    pub contract: ChainAddress,
    pub change: i64,
}

/// One bundled operation inside a landed batch, with the balance-updates it
/// produced and the destination it was addressed to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LandedOp {
    pub destination: ChainAddress,
    pub balance_updates: Vec<BalanceUpdate>,
}

/// The node's view of a landed (included-in-a-block) operation group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OperationResult {
    pub hash: String,
    pub contents: Vec<LandedOp>,
}
