use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use gas_station_types::{
    ChainAddress,
    Condition,
    ConditionId,
    Contract,
    ContractId,
    CreditVault,
    Entrypoint,
    EntrypointId,
    OperationId,
    OperationStatus,
    Sponsor,
    SponsorId,
    VaultId,
};

use crate::errors::LedgerError;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Parameters for a newly-created contract, mirroring the `/contracts` POST
/// body (§6): a contract is created together with its entrypoints in one
/// call, bound to an already-existing vault.
#[derive(Clone, Debug)]
pub struct NewContract {
    pub address: ChainAddress,
    pub owner_sponsor_id: SponsorId,
    pub name: String,
    pub vault_id: VaultId,
    pub max_calls_per_month: i64,
    pub entrypoints: Vec<NewEntrypoint>,
}

#[derive(Clone, Debug)]
pub struct NewEntrypoint {
    pub name: String,
    pub is_enabled: bool,
}

/// One condition creation request; `contract_id`/`entrypoint_id` matter only
/// for the `MaxCallsPerEntrypoint` kind.
#[derive(Clone, Debug)]
pub enum NewCondition {
    MaxCallsPerEntrypoint { contract_id: ContractId, entrypoint_id: EntrypointId, vault_id: VaultId, max: i64 },
    MaxCallsPerSponsee { contract_id: ContractId, vault_id: VaultId, max: i64 },
}

/// Everything the Admission API learns about one sub-operation by the time
/// it is ready to hand the outcome to the Ledger (§4.6 step 6): the slot of
/// a per-entrypoint condition to increment, if any, is resolved once at
/// admission time and carried through so the increment and the Operation
/// insert happen in the same transaction.
#[derive(Clone, Debug)]
pub struct RecordedOperation {
    pub sender_address: ChainAddress,
    pub contract_id: ContractId,
    pub entrypoint_id: EntrypointId,
    pub tx_hash: String,
    pub status: OperationStatus,
    /// Present iff an active `MaxCallsPerEntrypoint` condition governed this
    /// call and it is being recorded as `Ok` — its counter is incremented
    /// atomically with the Operation insert, and the insert itself is
    /// downgraded to `Failing` if that increment loses a race against the
    /// condition's cap (closes the TOCTOU window called out in §4.2).
    pub increment_condition: Option<ConditionId>,
}

/// C1: persistent mapping sponsor -> balance, contract -> credit-vault, plus
/// monthly/condition counters. All mutations are serialisable; concurrent
/// admissions reading `amount` while a Reconciler debits see either the
/// pre- or post-debit value, never a torn read.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn create_sponsor(&self, name: &str, chain_address: &str) -> LedgerResult<Sponsor>;
    async fn get_sponsor(&self, id: SponsorId) -> LedgerResult<Sponsor>;
    async fn get_sponsor_by_address(&self, address: &str) -> LedgerResult<Sponsor>;
    async fn record_withdraw_counter(&self, sponsor_id: SponsorId, counter: u64) -> LedgerResult<Sponsor>;

    async fn create_vault(&self, owner_sponsor_id: SponsorId) -> LedgerResult<CreditVault>;
    async fn get_vault(&self, id: VaultId) -> LedgerResult<CreditVault>;
    async fn get_vault_by_contract(&self, address: &str) -> LedgerResult<CreditVault>;
    async fn list_vaults_for_sponsor(&self, sponsor_id: SponsorId) -> LedgerResult<Vec<CreditVault>>;
    async fn credit_vault(&self, id: VaultId, delta: i64) -> LedgerResult<CreditVault>;
    async fn debit_vault(&self, id: VaultId, delta: i64) -> LedgerResult<CreditVault>;

    async fn create_contract(&self, new_contract: NewContract) -> LedgerResult<Contract>;
    async fn get_contract(&self, id: ContractId) -> LedgerResult<Contract>;
    async fn get_contract_by_address(&self, address: &str) -> LedgerResult<Contract>;
    async fn list_contracts_for_sponsor(&self, sponsor_id: SponsorId) -> LedgerResult<Vec<Contract>>;
    async fn update_max_calls_per_month(&self, contract_id: ContractId, max_calls: i64) -> LedgerResult<Contract>;

    async fn list_entrypoints(&self, contract_id: ContractId) -> LedgerResult<Vec<Entrypoint>>;
    async fn get_entrypoint(&self, contract_id: ContractId, name: &str) -> LedgerResult<Entrypoint>;
    async fn update_entrypoints(&self, updates: &[(EntrypointId, bool)]) -> LedgerResult<Vec<Entrypoint>>;

    /// Count of Operation rows for `contract_id` created since the first of
    /// the current calendar month (UTC).
    async fn count_operations_this_month(&self, contract_id: ContractId) -> LedgerResult<i64>;

    /// Count of Operation rows by `sender_address` against `contract_id`
    /// created at or after `since` — the live per-sponsee count (§4.2 step 4).
    async fn count_sponsee_calls_since(
        &self,
        sender_address: &str,
        contract_id: ContractId,
        since: DateTime<Utc>,
    ) -> LedgerResult<i64>;

    async fn create_condition(&self, new_condition: NewCondition) -> LedgerResult<Condition>;
    async fn list_conditions_for_vault(&self, vault_id: VaultId) -> LedgerResult<Vec<Condition>>;
    async fn active_max_calls_per_entrypoint(
        &self,
        contract_id: ContractId,
        entrypoint_id: EntrypointId,
    ) -> LedgerResult<Option<Condition>>;
    async fn active_max_calls_per_sponsee(&self, contract_id: ContractId) -> LedgerResult<Option<Condition>>;

    /// Transactionally inserts the Operation row and, if `increment_condition`
    /// is set and the status is `Ok`, increments that condition's counter in
    /// the same transaction, re-checking its cap at commit time. If the
    /// increment loses the race, the row is still inserted but downgraded to
    /// `Failing`, and this returns `ConditionExceeded` so the caller knows
    /// the recorded status differs from what it requested.
    async fn record_operation(&self, op: RecordedOperation) -> LedgerResult<OperationId>;

    /// Idempotent per (tx_hash, contract destination): a second call with
    /// the same args is a no-op; a second call with a different cost is
    /// last-writer-wins (the Reconciler only calls this once per batch).
    async fn set_operation_cost(&self, tx_hash: &str, contract_id: ContractId, cost: i64) -> LedgerResult<()>;
}
