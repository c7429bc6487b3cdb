//! Request/response bodies of §6, field-named exactly as the table there
//! (camelCase on the wire; snake_case in Rust via `serde(rename_all)`).

use gas_station_types::{
    ChainAddress,
    Condition,
    Contract,
    ContractId,
    CreditVault,
    Entrypoint,
    EntrypointId,
    Sponsor,
    SponsorId,
    VaultId,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthBody {
    pub status: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSponsorBody {
    pub name: String,
    pub chain_address: ChainAddress,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntrypointBody {
    pub name: String,
    pub is_enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractBody {
    pub address: ChainAddress,
    pub owner_id: SponsorId,
    pub name: String,
    pub vault_id: VaultId,
    pub entrypoints: Vec<NewEntrypointBody>,
    #[serde(default = "default_max_calls_per_month")]
    pub max_calls_per_month: i64,
}

fn default_max_calls_per_month() -> i64 {
    -1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntrypointBody {
    pub id: EntrypointId,
    pub is_enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositBody {
    pub vault_id: VaultId,
    pub amount: i64,
    pub operation_hash: String,
    pub owner_id: SponsorId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    pub vault_id: VaultId,
    pub amount: i64,
    pub withdraw_counter: u64,
    pub signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub tx_hash: String,
    pub counter: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParameters {
    pub entrypoint: String,
    pub value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubOperationBody {
    pub destination: ChainAddress,
    pub parameters: OperationParameters,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBody {
    pub sender_address: ChainAddress,
    pub operations: Vec<SubOperationBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperationBody {
    #[serde(flatten)]
    pub operation: OperationBody,
    pub sender_key: String,
    pub signature: String,
    pub micheline_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub result: &'static str,
    pub tx_hash: String,
}

// `type` keeps the PascalCase spelling `Condition` itself uses for its tag
// (see gas_station_types::domain); only the nested fields are camelCase.
#[derive(Deserialize)]
#[serde(tag = "type")]
pub enum NewConditionBody {
    MaxCallsPerEntrypoint {
        #[serde(rename = "contractId")]
        contract_id: ContractId,
        #[serde(rename = "entrypointId")]
        entrypoint_id: EntrypointId,
        #[serde(rename = "vaultId")]
        vault_id: VaultId,
        max: i64,
    },
    MaxCallsPerSponsee {
        #[serde(rename = "contractId")]
        contract_id: ContractId,
        #[serde(rename = "vaultId")]
        vault_id: VaultId,
        max: i64,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaxCallsBody {
    pub max_calls: i64,
}

// Domain types double as response bodies directly; no wrapper struct per
// entity is needed since their field casing already matches the wire
// format — `Sponsor`/`CreditVault`/`Contract`/`Entrypoint` carry their own
// `#[serde(rename_all = "camelCase")]` and `Condition` renames each field
// individually (see gas_station_types::domain).
pub type SponsorDto = Sponsor;
pub type ContractDto = Contract;
pub type EntrypointDto = Entrypoint;
pub type CreditVaultDto = CreditVault;
pub type ConditionDto = Condition;
