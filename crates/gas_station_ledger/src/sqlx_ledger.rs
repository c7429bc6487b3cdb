use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use gas_station_types::{
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
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::ledger::{CreditLedger, LedgerResult, NewCondition, NewContract, RecordedOperation};

/// sqlx-backed `CreditLedger`. Uses the `Any` driver so the same code runs
/// against Postgres in production and an in-memory SQLite database in tests,
/// the way `other_examples`' session repository is exercised against a
/// throwaway in-memory sqlite pool per test.
pub struct SqlxCreditLedger {
    pool: AnyPool,
}

impl SqlxCreditLedger {
    pub async fn connect(database_url: &str) -> LedgerResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> LedgerResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| LedgerError::Database(e.into()))?;
        Ok(())
    }
}

fn sponsor_from_row(row: &sqlx::any::AnyRow) -> Sponsor {
    Sponsor {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).expect("stored uuid"),
        name: row.get("name"),
        chain_address: row.get("chain_address"),
        withdraw_counter: row.get::<i64, _>("withdraw_counter") as u64,
    }
}

fn vault_from_row(row: &sqlx::any::AnyRow) -> CreditVault {
    CreditVault {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).expect("stored uuid"),
        owner_sponsor_id: Uuid::parse_str(row.get::<String, _>("owner_sponsor_id").as_str())
            .expect("stored uuid"),
        amount: row.get::<i64, _>("amount") as u64,
    }
}

fn contract_from_row(row: &sqlx::any::AnyRow) -> Contract {
    Contract {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).expect("stored uuid"),
        address: row.get("address"),
        owner_sponsor_id: Uuid::parse_str(row.get::<String, _>("owner_sponsor_id").as_str())
            .expect("stored uuid"),
        vault_id: Uuid::parse_str(row.get::<String, _>("vault_id").as_str()).expect("stored uuid"),
        name: row.get("name"),
        max_calls_per_month: row.get("max_calls_per_month"),
    }
}

fn entrypoint_from_row(row: &sqlx::any::AnyRow) -> Entrypoint {
    Entrypoint {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).expect("stored uuid"),
        contract_id: Uuid::parse_str(row.get::<String, _>("contract_id").as_str()).expect("stored uuid"),
        name: row.get("name"),
        is_enabled: row.get("is_enabled"),
    }
}

fn condition_from_row(row: &sqlx::any::AnyRow) -> Condition {
    let id: ConditionId = Uuid::parse_str(row.get::<String, _>("id").as_str()).expect("stored uuid");
    let contract_id: ContractId =
        Uuid::parse_str(row.get::<String, _>("contract_id").as_str()).expect("stored uuid");
    let vault_id: VaultId = Uuid::parse_str(row.get::<String, _>("vault_id").as_str()).expect("stored uuid");
    let max: i64 = row.get("max_calls");
    let current: i64 = row.get("current_calls");
    let is_active: bool = row.get("is_active");
    let created_at: DateTime<Utc> = row.get("created_at");
    let kind: String = row.get("kind");
    match kind.as_str() {
        "max_calls_per_entrypoint" => {
            let entrypoint_id: EntrypointId = Uuid::parse_str(
                row.get::<Option<String>, _>("entrypoint_id").expect("entrypoint_id set").as_str(),
            )
            .expect("stored uuid");
            Condition::MaxCallsPerEntrypoint {
                id,
                contract_id,
                entrypoint_id,
                vault_id,
                max,
                current,
                created_at,
                is_active,
            }
        }
        _ => Condition::MaxCallsPerSponsee { id, contract_id, vault_id, max, current, created_at, is_active },
    }
}

#[async_trait]
impl CreditLedger for SqlxCreditLedger {
    #[instrument(skip(self), err)]
    async fn create_sponsor(&self, name: &str, chain_address: &str) -> LedgerResult<Sponsor> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sponsors (id, name, chain_address, withdraw_counter) VALUES (?, ?, ?, 0)")
            .bind(id.to_string())
            .bind(name)
            .bind(chain_address)
            .execute(&self.pool)
            .await?;
        self.get_sponsor(id).await
    }

    #[instrument(skip(self), err)]
    async fn get_sponsor(&self, id: SponsorId) -> LedgerResult<Sponsor> {
        let row = sqlx::query("SELECT * FROM sponsors WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::SponsorNotFound)?;
        Ok(sponsor_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn get_sponsor_by_address(&self, address: &str) -> LedgerResult<Sponsor> {
        let row = sqlx::query("SELECT * FROM sponsors WHERE chain_address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::SponsorNotFound)?;
        Ok(sponsor_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn record_withdraw_counter(&self, sponsor_id: SponsorId, counter: u64) -> LedgerResult<Sponsor> {
        let affected = sqlx::query("UPDATE sponsors SET withdraw_counter = ? WHERE id = ?")
            .bind(counter as i64)
            .bind(sponsor_id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(LedgerError::SponsorNotFound);
        }
        self.get_sponsor(sponsor_id).await
    }

    #[instrument(skip(self), err)]
    async fn create_vault(&self, owner_sponsor_id: SponsorId) -> LedgerResult<CreditVault> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO credits (id, owner_sponsor_id, amount) VALUES (?, ?, 0)")
            .bind(id.to_string())
            .bind(owner_sponsor_id.to_string())
            .execute(&self.pool)
            .await?;
        self.get_vault(id).await
    }

    #[instrument(skip(self), err)]
    async fn get_vault(&self, id: VaultId) -> LedgerResult<CreditVault> {
        let row = sqlx::query("SELECT * FROM credits WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::VaultNotFound)?;
        Ok(vault_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn get_vault_by_contract(&self, address: &str) -> LedgerResult<CreditVault> {
        let contract = self.get_contract_by_address(address).await?;
        self.get_vault(contract.vault_id).await
    }

    #[instrument(skip(self), err)]
    async fn list_vaults_for_sponsor(&self, sponsor_id: SponsorId) -> LedgerResult<Vec<CreditVault>> {
        let rows = sqlx::query("SELECT * FROM credits WHERE owner_sponsor_id = ?")
            .bind(sponsor_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(vault_from_row).collect())
    }

    #[instrument(skip(self), err)]
    async fn credit_vault(&self, id: VaultId, delta: i64) -> LedgerResult<CreditVault> {
        let mut tx = self.pool.begin().await?;
        let affected = sqlx::query("UPDATE credits SET amount = amount + ? WHERE id = ?")
            .bind(delta)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(LedgerError::VaultNotFound);
        }
        let row =
            sqlx::query("SELECT * FROM credits WHERE id = ?").bind(id.to_string()).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(vault_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn debit_vault(&self, id: VaultId, delta: i64) -> LedgerResult<CreditVault> {
        let mut tx = self.pool.begin().await?;
        let affected = sqlx::query("UPDATE credits SET amount = amount - ? WHERE id = ? AND amount >= ?")
            .bind(delta)
            .bind(id.to_string())
            .bind(delta)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            // Either the vault is missing or the debit would drive it
            // negative; distinguish the two for a clearer error.
            let exists = sqlx::query("SELECT 1 FROM credits WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.rollback().await?;
            return if exists {
                Err(LedgerError::WouldGoNegative { vault_id: id, amount: delta })
            } else {
                Err(LedgerError::VaultNotFound)
            };
        }
        let row =
            sqlx::query("SELECT * FROM credits WHERE id = ?").bind(id.to_string()).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(vault_from_row(&row))
    }

    #[instrument(skip(self, new_contract), err)]
    async fn create_contract(&self, new_contract: NewContract) -> LedgerResult<Contract> {
        let existing = sqlx::query("SELECT 1 FROM contracts WHERE address = ?")
            .bind(&new_contract.address)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(LedgerError::ContractAlreadyRegistered);
        }

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO contracts (id, address, owner_sponsor_id, vault_id, name, max_calls_per_month) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&new_contract.address)
        .bind(new_contract.owner_sponsor_id.to_string())
        .bind(new_contract.vault_id.to_string())
        .bind(&new_contract.name)
        .bind(new_contract.max_calls_per_month)
        .execute(&mut *tx)
        .await?;

        for entrypoint in &new_contract.entrypoints {
            sqlx::query("INSERT INTO entrypoints (id, contract_id, name, is_enabled) VALUES (?, ?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(id.to_string())
                .bind(&entrypoint.name)
                .bind(entrypoint.is_enabled)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.get_contract(id).await
    }

    #[instrument(skip(self), err)]
    async fn get_contract(&self, id: ContractId) -> LedgerResult<Contract> {
        let row = sqlx::query("SELECT * FROM contracts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::ContractNotFound)?;
        Ok(contract_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn get_contract_by_address(&self, address: &str) -> LedgerResult<Contract> {
        let row = sqlx::query("SELECT * FROM contracts WHERE address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::ContractNotFound)?;
        Ok(contract_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn list_contracts_for_sponsor(&self, sponsor_id: SponsorId) -> LedgerResult<Vec<Contract>> {
        let rows = sqlx::query("SELECT * FROM contracts WHERE owner_sponsor_id = ?")
            .bind(sponsor_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(contract_from_row).collect())
    }

    #[instrument(skip(self), err)]
    async fn update_max_calls_per_month(&self, contract_id: ContractId, max_calls: i64) -> LedgerResult<Contract> {
        let affected = sqlx::query("UPDATE contracts SET max_calls_per_month = ? WHERE id = ?")
            .bind(max_calls)
            .bind(contract_id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(LedgerError::ContractNotFound);
        }
        self.get_contract(contract_id).await
    }

    #[instrument(skip(self), err)]
    async fn list_entrypoints(&self, contract_id: ContractId) -> LedgerResult<Vec<Entrypoint>> {
        let rows = sqlx::query("SELECT * FROM entrypoints WHERE contract_id = ?")
            .bind(contract_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(entrypoint_from_row).collect())
    }

    #[instrument(skip(self), err)]
    async fn get_entrypoint(&self, contract_id: ContractId, name: &str) -> LedgerResult<Entrypoint> {
        let row = sqlx::query("SELECT * FROM entrypoints WHERE contract_id = ? AND name = ?")
            .bind(contract_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::EntrypointNotFound)?;
        Ok(entrypoint_from_row(&row))
    }

    #[instrument(skip(self, updates), err)]
    async fn update_entrypoints(&self, updates: &[(EntrypointId, bool)]) -> LedgerResult<Vec<Entrypoint>> {
        let mut tx = self.pool.begin().await?;
        for (id, is_enabled) in updates {
            sqlx::query("UPDATE entrypoints SET is_enabled = ? WHERE id = ?")
                .bind(*is_enabled)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        let mut result = Vec::with_capacity(updates.len());
        for (id, _) in updates {
            let row = sqlx::query("SELECT * FROM entrypoints WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(LedgerError::EntrypointNotFound)?;
            result.push(entrypoint_from_row(&row));
        }
        tx.commit().await?;
        Ok(result)
    }

    #[instrument(skip(self), err)]
    async fn count_operations_this_month(&self, contract_id: ContractId) -> LedgerResult<i64> {
        let first_of_month = first_of_current_month();
        let row = sqlx::query("SELECT COUNT(*) AS n FROM operations WHERE contract_id = ? AND created_at >= ?")
            .bind(contract_id.to_string())
            .bind(first_of_month)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }

    #[instrument(skip(self), err)]
    async fn count_sponsee_calls_since(
        &self,
        sender_address: &str,
        contract_id: ContractId,
        since: DateTime<Utc>,
    ) -> LedgerResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM operations \
             WHERE sender_address = ? AND contract_id = ? AND created_at >= ?",
        )
        .bind(sender_address)
        .bind(contract_id.to_string())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n"))
    }

    #[instrument(skip(self, new_condition), err)]
    async fn create_condition(&self, new_condition: NewCondition) -> LedgerResult<Condition> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        match new_condition {
            NewCondition::MaxCallsPerEntrypoint { contract_id, entrypoint_id, vault_id, max } => {
                let existing = self.active_max_calls_per_entrypoint(contract_id, entrypoint_id).await?;
                if existing.is_some() {
                    return Err(LedgerError::ConditionAlreadyExists);
                }
                sqlx::query(
                    "INSERT INTO conditions \
                     (id, kind, contract_id, entrypoint_id, vault_id, max_calls, current_calls, is_active, created_at) \
                     VALUES (?, 'max_calls_per_entrypoint', ?, ?, ?, ?, 0, TRUE, ?)",
                )
                .bind(id.to_string())
                .bind(contract_id.to_string())
                .bind(entrypoint_id.to_string())
                .bind(vault_id.to_string())
                .bind(max)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            NewCondition::MaxCallsPerSponsee { contract_id, vault_id, max } => {
                let existing = self.active_max_calls_per_sponsee(contract_id).await?;
                if existing.is_some() {
                    return Err(LedgerError::ConditionAlreadyExists);
                }
                sqlx::query(
                    "INSERT INTO conditions \
                     (id, kind, contract_id, entrypoint_id, vault_id, max_calls, current_calls, is_active, created_at) \
                     VALUES (?, 'max_calls_per_sponsee', ?, NULL, ?, ?, 0, TRUE, ?)",
                )
                .bind(id.to_string())
                .bind(contract_id.to_string())
                .bind(vault_id.to_string())
                .bind(max)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }
        let row = sqlx::query("SELECT * FROM conditions WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(condition_from_row(&row))
    }

    #[instrument(skip(self), err)]
    async fn list_conditions_for_vault(&self, vault_id: VaultId) -> LedgerResult<Vec<Condition>> {
        let rows = sqlx::query("SELECT * FROM conditions WHERE vault_id = ?")
            .bind(vault_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(condition_from_row).collect())
    }

    #[instrument(skip(self), err)]
    async fn active_max_calls_per_entrypoint(
        &self,
        contract_id: ContractId,
        entrypoint_id: EntrypointId,
    ) -> LedgerResult<Option<Condition>> {
        let row = sqlx::query(
            "SELECT * FROM conditions \
             WHERE kind = 'max_calls_per_entrypoint' AND contract_id = ? AND entrypoint_id = ? AND is_active = TRUE",
        )
        .bind(contract_id.to_string())
        .bind(entrypoint_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(condition_from_row))
    }

    #[instrument(skip(self), err)]
    async fn active_max_calls_per_sponsee(&self, contract_id: ContractId) -> LedgerResult<Option<Condition>> {
        let row = sqlx::query(
            "SELECT * FROM conditions WHERE kind = 'max_calls_per_sponsee' AND contract_id = ? AND is_active = TRUE",
        )
        .bind(contract_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(condition_from_row))
    }

    #[instrument(skip(self, op), err)]
    async fn record_operation(&self, op: RecordedOperation) -> LedgerResult<OperationId> {
        let mut tx = self.pool.begin().await?;

        let mut status = op.status;
        if status == OperationStatus::Ok {
            if let Some(condition_id) = op.increment_condition {
                let affected = sqlx::query(
                    "UPDATE conditions SET current_calls = current_calls + 1 \
                     WHERE id = ? AND current_calls < max_calls",
                )
                .bind(condition_id.to_string())
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if affected == 0 {
                    // Lost the race against the condition's cap: downgrade
                    // to failing rather than silently over-admitting.
                    status = OperationStatus::Failing;
                }
            }
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO operations (id, sender_address, contract_id, entrypoint_id, tx_hash, status, cost, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?)",
        )
        .bind(id.to_string())
        .bind(&op.sender_address)
        .bind(op.contract_id.to_string())
        .bind(op.entrypoint_id.to_string())
        .bind(&op.tx_hash)
        .bind(status.to_string())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if status != op.status {
            return Err(LedgerError::ConditionExceeded(
                op.increment_condition.expect("status only downgraded via a condition race"),
            ));
        }
        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn set_operation_cost(&self, tx_hash: &str, contract_id: ContractId, cost: i64) -> LedgerResult<()> {
        sqlx::query("UPDATE operations SET cost = ? WHERE tx_hash = ? AND contract_id = ?")
            .bind(cost)
            .bind(tx_hash)
            .bind(contract_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn first_of_current_month() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_day(1)
        .and_then(|d| d.with_hour(0))
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .expect("zeroing out date components never fails")
}
