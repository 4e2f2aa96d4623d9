//! The Execution Record Store (§4.3) and Idempotence Cache (§4.2) storage
//! contracts. Both the in-memory and Postgres implementations in this
//! crate satisfy these traits identically from the orchestrator's view.

use async_trait::async_trait;
use chrono::Duration;
use crucible_core::ExecutionId;
use crucible_error::Error;
use crucible_execution::{CacheEntry, CacheKey, ExecutionRecord, TerminalFields};

/// Persists execution rows (§4.3): `Create`, `Complete`, `Get`.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a new row in the `running` state. Must succeed before the
    /// Sandbox Executor is invoked (§4.3).
    async fn create(&self, record: ExecutionRecord) -> Result<(), Error>;

    /// Atomically write terminal status, metrics, output/error, and
    /// `completed_at` (§4.3). Idempotent when the fields match an already
    /// terminal row; rejected on conflict (§3 invariant 2, enforced by
    /// `ExecutionRecord::complete`).
    async fn complete(&self, id: ExecutionId, fields: TerminalFields) -> Result<(), Error>;

    /// Read a row by id.
    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, Error>;
}

/// Persists idempotence cache slots (§4.2).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a slot. An expired slot must be treated as absent (§3: "an
    /// expired slot is treated as absent").
    async fn lookup(&self, key: CacheKey) -> Result<Option<CacheEntry>, Error>;

    /// Upsert a slot: refresh the TTL and swap to the latest succeeded
    /// execution id (§3: "writes are idempotent"). `ttl` is bound as a
    /// parameter, never formatted into SQL text.
    async fn store(&self, key: CacheKey, execution_id: ExecutionId, ttl: Duration) -> Result<(), Error>;

    /// Bump the hit counter on a cache hit.
    async fn increment_hit(&self, key: CacheKey) -> Result<(), Error>;
}
