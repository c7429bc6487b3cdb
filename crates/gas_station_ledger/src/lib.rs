//! Credit Ledger (C1): persistent sponsor/vault/contract/condition bookkeeping.

pub mod errors;
pub mod ledger;
pub mod sqlx_ledger;

pub use errors::LedgerError;
pub use ledger::{CreditLedger, LedgerResult, NewCondition, NewContract, NewEntrypoint, RecordedOperation};
pub use sqlx_ledger::SqlxCreditLedger;

#[cfg(any(test, feature = "testing"))]
pub use ledger::MockCreditLedger;
