use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sponsor not found")]
    SponsorNotFound,
    #[error("contract not found")]
    ContractNotFound,
    #[error("entrypoint not found")]
    EntrypointNotFound,
    #[error("vault not found")]
    VaultNotFound,
    #[error("condition not found")]
    ConditionNotFound,
    #[error("contract address already registered")]
    ContractAlreadyRegistered,
    #[error("an active condition of this kind already exists for this scope")]
    ConditionAlreadyExists,
    #[error("debiting {amount} would drive vault {vault_id} negative")]
    WouldGoNegative { vault_id: uuid::Uuid, amount: i64 },
    #[error("condition {0} is already at its cap")]
    ConditionExceeded(uuid::Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
