//! Postgres-backed `ExecutionStore`/`CacheStore`.
//!
//! The source this workspace was distilled from built TTL expiry by
//! formatting the interval directly into SQL text — an injection risk.
//! Every query here binds its values as parameters instead, including the
//! TTL (computed client-side into an absolute `expires_at` timestamp and
//! bound as `$n`, never interpolated).

use crate::traits::{CacheStore, ExecutionStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crucible_core::ExecutionId;
use crucible_error::Error;
use crucible_execution::{CacheEntry, CacheKey, ExecutionRecord, TerminalFields};
use sqlx::{PgPool, Row};

fn infra(operation: &str, err: sqlx::Error) -> Error {
    Error::infra(format!("store operation {operation} failed: {err}"))
}

/// Execution records, one row per `ExecutionRecord`.
pub struct PostgresExecutionStore {
    pool: PgPool,
}

impl PostgresExecutionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PostgresExecutionStore {
    async fn create(&self, record: ExecutionRecord) -> Result<(), Error> {
        let envelope = serde_json::to_value(&record)
            .map_err(|e| Error::fatal(format!("failed to serialize execution record: {e}")))?;
        sqlx::query(
            "INSERT INTO executions (id, tool_name, status, created_at, envelope) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id.to_string())
        .bind(record.tool_name.as_str())
        .bind(record.status.to_string())
        .bind(record.created_at)
        .bind(envelope)
        .execute(&self.pool)
        .await
        .map_err(|e| infra("create", e))?;
        Ok(())
    }

    async fn complete(&self, id: ExecutionId, fields: TerminalFields) -> Result<(), Error> {
        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("execution {id}")))?;
        record.complete(fields)?;
        let envelope = serde_json::to_value(&record)
            .map_err(|e| Error::fatal(format!("failed to serialize execution record: {e}")))?;
        sqlx::query(
            "UPDATE executions SET status = $2, completed_at = $3, envelope = $4 WHERE id = $1",
        )
        .bind(id.to_string())
        .bind(record.status.to_string())
        .bind(record.completed_at)
        .bind(envelope)
        .execute(&self.pool)
        .await
        .map_err(|e| infra("complete", e))?;
        Ok(())
    }

    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, Error> {
        let row = sqlx::query("SELECT envelope FROM executions WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| infra("get", e))?;
        let Some(row) = row else { return Ok(None) };
        let envelope: serde_json::Value =
            row.try_get("envelope").map_err(|e| infra("get/decode", e))?;
        let record = serde_json::from_value(envelope)
            .map_err(|e| Error::fatal(format!("corrupt execution envelope: {e}")))?;
        Ok(Some(record))
    }
}

/// Idempotence cache slots.
pub struct PostgresCacheStore {
    pool: PgPool,
}

impl PostgresCacheStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for PostgresCacheStore {
    async fn lookup(&self, key: CacheKey) -> Result<Option<CacheEntry>, Error> {
        let row = sqlx::query(
            "SELECT execution_id, expires_at, hit_count FROM cache_slots \
             WHERE tool_version_id = $1 AND input_hash = $2 AND expires_at > now()",
        )
        .bind(key.tool_version_id.to_string())
        .bind(key.input_hash.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infra("cache lookup", e))?;
        let Some(row) = row else { return Ok(None) };
        let execution_id: String = row.try_get("execution_id").map_err(|e| infra("cache lookup/decode", e))?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(|e| infra("cache lookup/decode", e))?;
        let hit_count: i64 = row.try_get("hit_count").map_err(|e| infra("cache lookup/decode", e))?;
        let execution_id = ExecutionId::parse(&execution_id)
            .map_err(|e| Error::fatal(format!("corrupt cache row execution_id: {e}")))?;
        Ok(Some(CacheEntry { execution_id, expires_at, hit_count: hit_count.max(0) as u64 }))
    }

    async fn store(&self, key: CacheKey, execution_id: ExecutionId, ttl: Duration) -> Result<(), Error> {
        let expires_at = Utc::now() + ttl;
        sqlx::query(
            "INSERT INTO cache_slots (tool_version_id, input_hash, execution_id, expires_at, hit_count) \
             VALUES ($1, $2, $3, $4, 0) \
             ON CONFLICT (tool_version_id, input_hash) \
             DO UPDATE SET execution_id = excluded.execution_id, expires_at = excluded.expires_at",
        )
        .bind(key.tool_version_id.to_string())
        .bind(key.input_hash.to_string())
        .bind(execution_id.to_string())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infra("cache store", e))?;
        Ok(())
    }

    async fn increment_hit(&self, key: CacheKey) -> Result<(), Error> {
        sqlx::query(
            "UPDATE cache_slots SET hit_count = hit_count + 1 \
             WHERE tool_version_id = $1 AND input_hash = $2",
        )
        .bind(key.tool_version_id.to_string())
        .bind(key.input_hash.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| infra("cache increment_hit", e))?;
        Ok(())
    }
}
