use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SponsorId = Uuid;
pub type VaultId = Uuid;
pub type ContractId = Uuid;
pub type EntrypointId = Uuid;
pub type OperationId = Uuid;
pub type ConditionId = Uuid;

/// A sender/recipient address on the target chain. Implicit accounts (plain
/// keys) are disjoint from contract (originated) addresses; the Admission
/// API rejects implicit addresses as call destinations.
pub type ChainAddress = String;

/// Prefix shared by every implicit account address on the target chain.
/// Used to distinguish withdrawals from sponsored contract calls when
/// grouping reconciler balance-updates (see gas_station_reconciler).
pub const IMPLICIT_ACCOUNT_PREFIX: &str = "tz";

pub fn is_implicit_account(address: &str) -> bool {
    address.starts_with(IMPLICIT_ACCOUNT_PREFIX)
}

/// Entity holding credit vaults that pays fees on behalf of sponsees.
/// Created by the admin API; never deleted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sponsor {
    pub id: SponsorId,
    pub name: String,
    pub chain_address: ChainAddress,
    pub withdraw_counter: u64,
}

/// Prepaid balance bound to one or more contracts. `amount` is mutated only
/// by confirmed deposits, confirmed withdrawals, and Reconciler debits; it
/// must never go negative after a commit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreditVault {
    pub id: VaultId,
    pub owner_sponsor_id: SponsorId,
    pub amount: u64,
}

/// An on-chain target bound to exactly one credit vault.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub address: ChainAddress,
    pub owner_sponsor_id: SponsorId,
    pub vault_id: VaultId,
    pub name: String,
    /// -1 = unlimited, otherwise > 0.
    pub max_calls_per_month: i64,
}

impl Contract {
    pub fn monthly_cap_unlimited(&self) -> bool {
        self.max_calls_per_month == -1
    }
}

/// Named method of a deployed contract. Unique per (contract_id, name).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entrypoint {
    pub id: EntrypointId,
    pub contract_id: ContractId,
    pub name: String,
    pub is_enabled: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationStatus {
    Ok,
    Failing,
}

/// Audit record of one sub-operation admitted (or rejected at the batch
/// stage) by the Scheduler. `cost` is filled in later, at most once per
/// (tx_hash, contract_id), by the Fee Reconciler.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub sender_address: ChainAddress,
    pub contract_id: ContractId,
    pub entrypoint_id: EntrypointId,
    pub tx_hash: String,
    pub status: OperationStatus,
    pub cost: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Tagged policy condition. Stored as one logical table with a discriminator;
/// at most one active condition of each kind per scope.
// Field names are individually renamed to camelCase rather than via a
// container-level `rename_all`, which would also camelCase the `type` tag
// itself (e.g. turning "MaxCallsPerEntrypoint" into "maxCallsPerEntrypoint")
// and break spec.md §6's literal tag spelling.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Condition {
    MaxCallsPerEntrypoint {
        id: ConditionId,
        #[serde(rename = "contractId")]
        contract_id: ContractId,
        #[serde(rename = "entrypointId")]
        entrypoint_id: EntrypointId,
        #[serde(rename = "vaultId")]
        vault_id: VaultId,
        max: i64,
        current: i64,
        #[serde(rename = "createdAt")]
        created_at: DateTime<Utc>,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
    MaxCallsPerSponsee {
        id: ConditionId,
        #[serde(rename = "contractId")]
        contract_id: ContractId,
        #[serde(rename = "vaultId")]
        vault_id: VaultId,
        max: i64,
        current: i64,
        #[serde(rename = "createdAt")]
        created_at: DateTime<Utc>,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
}

impl Condition {
    pub fn is_active(&self) -> bool {
        match self {
            Condition::MaxCallsPerEntrypoint { is_active, .. }
            | Condition::MaxCallsPerSponsee { is_active, .. } => *is_active,
        }
    }

    pub fn vault_id(&self) -> VaultId {
        match self {
            Condition::MaxCallsPerEntrypoint { vault_id, .. }
            | Condition::MaxCallsPerSponsee { vault_id, .. } => *vault_id,
        }
    }

    pub fn satisfied(&self) -> bool {
        match self {
            Condition::MaxCallsPerEntrypoint { current, max, .. }
            | Condition::MaxCallsPerSponsee { current, max, .. } => current < max,
        }
    }
}
