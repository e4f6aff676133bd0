//! Storage layer for the wasm module.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;

use quill_core::error::{StorageError, StorageResult};

use super::models::{WasmCode, WasmContract, WasmExecuteContract, WasmParams};

/// Storage trait for wasm module data.
///
/// Records are written once and every write is idempotent, so a block can be
/// replayed from its first message after a failure. Contracts change afterwards only through the
/// two targeted updates, both keyed by contract address.
#[async_trait]
pub trait WasmStorage: Send + Sync {
    async fn save_wasm_code(&self, code: &WasmCode) -> StorageResult<()>;

    async fn save_wasm_contract(&self, contract: &WasmContract) -> StorageResult<()>;

    async fn save_wasm_execute_contract(&self, execute: &WasmExecuteContract)
    -> StorageResult<()>;

    /// Point `contract` at `code_id` and record the migrate message and its result data.
    async fn update_contract_with_msg_migrate_contract(
        &self,
        sender: &str,
        contract: &str,
        code_id: u64,
        msg: &serde_json::Value,
        data: &str,
    ) -> StorageResult<()>;

    /// Set the admin of `contract`. An empty `admin` clears it.
    async fn update_contract_admin(
        &self,
        sender: &str,
        contract: &str,
        admin: &str,
    ) -> StorageResult<()>;

    async fn save_wasm_params(&self, params: &WasmParams) -> StorageResult<()>;
}

/// PostgreSQL implementation of WasmStorage.
pub struct PgWasmStorage {
    pool: PgPool,
}

impl PgWasmStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WasmStorage for PgWasmStorage {
    async fn save_wasm_code(&self, code: &WasmCode) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_code (code_id, sender, byte_code, instantiate_permission, height)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code_id) DO NOTHING
            "#,
        )
        .bind(to_i64(code.code_id, "wasm_code.code_id")?)
        .bind(&code.sender)
        .bind(&code.wasm_byte_code)
        .bind(code.instantiate_permission.as_ref().map(Json))
        .bind(to_i64(code.height, "wasm_code.height")?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn save_wasm_contract(&self, contract: &WasmContract) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_contract (
                contract_address, sender, creator, admin, code_id, label,
                raw_contract_message, funds, data, instantiated_at,
                contract_info_extension, height
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (contract_address) DO NOTHING
            "#,
        )
        .bind(&contract.contract_address)
        .bind(&contract.sender)
        .bind(&contract.creator)
        .bind(&contract.admin)
        .bind(to_i64(contract.code_id, "wasm_contract.code_id")?)
        .bind(&contract.label)
        .bind(&contract.raw_contract_msg)
        .bind(Json(&contract.funds))
        .bind(&contract.data)
        .bind(contract.instantiated_at)
        .bind(&contract.contract_info_extension)
        .bind(to_i64(contract.height, "wasm_contract.height")?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn save_wasm_execute_contract(
        &self,
        execute: &WasmExecuteContract,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_execute_contract (
                tx_hash, msg_index, sender, contract_address, raw_contract_message,
                funds, data, executed_at, height
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tx_hash, msg_index) DO NOTHING
            "#,
        )
        .bind(&execute.tx_hash)
        .bind(to_i64(execute.msg_index, "wasm_execute_contract.msg_index")?)
        .bind(&execute.sender)
        .bind(&execute.contract_address)
        .bind(&execute.raw_contract_msg)
        .bind(Json(&execute.funds))
        .bind(&execute.data)
        .bind(execute.executed_at)
        .bind(to_i64(execute.height, "wasm_execute_contract.height")?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn update_contract_with_msg_migrate_contract(
        &self,
        sender: &str,
        contract: &str,
        code_id: u64,
        msg: &serde_json::Value,
        data: &str,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE wasm_contract
            SET sender = $1, code_id = $3, raw_contract_message = $4, data = $5
            WHERE contract_address = $2
            "#,
        )
        .bind(sender)
        .bind(contract)
        .bind(to_i64(code_id, "wasm_contract.code_id")?)
        .bind(msg)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if result.rows_affected() == 0 {
            debug!(contract, "Migrated contract not indexed, nothing updated");
        }
        Ok(())
    }

    async fn update_contract_admin(
        &self,
        sender: &str,
        contract: &str,
        admin: &str,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE wasm_contract SET sender = $1, admin = $3 WHERE contract_address = $2",
        )
        .bind(sender)
        .bind(contract)
        .bind(admin)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if result.rows_affected() == 0 {
            debug!(contract, "Contract not indexed, admin not updated");
        }
        Ok(())
    }

    async fn save_wasm_params(&self, params: &WasmParams) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_params (
                height, code_upload_access, instantiate_default_permission, max_wasm_code_size
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (height) DO NOTHING
            "#,
        )
        .bind(to_i64(params.height, "wasm_params.height")?)
        .bind(Json(&params.code_upload_access))
        .bind(params.instantiate_default_permission.as_str())
        .bind(to_i64(params.max_wasm_code_size, "wasm_params.max_wasm_code_size")?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}

// =============================================================================
// Conversion helpers
// =============================================================================

/// Postgres has no unsigned 64-bit type.
fn to_i64(value: u64, field: &str) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{} out of BIGINT range: {}", field, value))
    })
}

/// SQL migrations for the wasm bundle.
/// Each migration is tracked and only executed once.
pub const MIGRATIONS: &[&str] = &[
    // Migration 0: Create wasm tables
    r#"
CREATE TABLE wasm_params (
    height BIGINT PRIMARY KEY,
    code_upload_access JSONB NOT NULL,
    instantiate_default_permission TEXT NOT NULL,
    max_wasm_code_size BIGINT NOT NULL
);

CREATE TABLE wasm_code (
    code_id BIGINT PRIMARY KEY,
    sender TEXT NOT NULL,
    byte_code BYTEA NOT NULL,
    instantiate_permission JSONB,
    height BIGINT NOT NULL
);

CREATE INDEX idx_wasm_code_height ON wasm_code(height);
CREATE INDEX idx_wasm_code_sender ON wasm_code(sender);

CREATE TABLE wasm_contract (
    contract_address TEXT PRIMARY KEY,
    sender TEXT NOT NULL,
    creator TEXT NOT NULL,
    admin TEXT NOT NULL DEFAULT '',
    code_id BIGINT NOT NULL,
    label TEXT NOT NULL,
    raw_contract_message JSONB NOT NULL,
    funds JSONB NOT NULL DEFAULT '[]'::JSONB,
    data TEXT NOT NULL DEFAULT '',
    instantiated_at TIMESTAMPTZ NOT NULL,
    contract_info_extension TEXT NOT NULL DEFAULT '',
    height BIGINT NOT NULL
);

CREATE INDEX idx_wasm_contract_code_id ON wasm_contract(code_id);
CREATE INDEX idx_wasm_contract_creator ON wasm_contract(creator);
CREATE INDEX idx_wasm_contract_height ON wasm_contract(height);

CREATE TABLE wasm_execute_contract (
    tx_hash TEXT NOT NULL,
    msg_index BIGINT NOT NULL,
    sender TEXT NOT NULL,
    contract_address TEXT NOT NULL,
    raw_contract_message JSONB NOT NULL,
    funds JSONB NOT NULL DEFAULT '[]'::JSONB,
    data TEXT NOT NULL DEFAULT '',
    executed_at TIMESTAMPTZ NOT NULL,
    height BIGINT NOT NULL,
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE INDEX idx_wasm_execute_contract_address ON wasm_execute_contract(contract_address);
CREATE INDEX idx_wasm_execute_height ON wasm_execute_contract(height);
CREATE INDEX idx_wasm_execute_sender ON wasm_execute_contract(sender);
"#,
];
