//! The Chain Oracle: a narrow, language-neutral abstraction over a remote
//! node, treated by the rest of the relayer as an external collaborator.

pub mod errors;
pub mod oracle;
pub mod types;

pub use errors::OracleError;
pub use oracle::{ChainOracle, OracleResult};
#[cfg(any(test, feature = "testing"))]
pub use oracle::MockChainOracle;
pub use types::{
    BalanceUpdate,
    LandedOp,
    OperationResult,
    PostedTx,
    SimulatedBatch,
    SimulatedOp,
    UnsignedOp,
};
