//! In-memory `ExecutionStore`/`CacheStore`, for tests and for running the
//! orchestrator without a database.

use crate::traits::{CacheStore, ExecutionStore};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use crucible_core::ExecutionId;
use crucible_error::Error;
use crucible_execution::{CacheEntry, CacheKey, ExecutionRecord, TerminalFields};
use dashmap::DashMap;

/// An `ExecutionStore` backed by a `DashMap`.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    rows: DashMap<ExecutionId, ExecutionRecord>,
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, record: ExecutionRecord) -> Result<(), Error> {
        if self.rows.contains_key(&record.id) {
            return Err(Error::validation_msg(format!(
                "execution {} already exists",
                record.id
            )));
        }
        self.rows.insert(record.id, record);
        Ok(())
    }

    async fn complete(&self, id: ExecutionId, fields: TerminalFields) -> Result<(), Error> {
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("execution {id}")))?;
        row.complete(fields)
    }

    async fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, Error> {
        Ok(self.rows.get(&id).map(|r| r.clone()))
    }
}

/// A `CacheStore` backed by a `DashMap`.
#[derive(Default)]
pub struct InMemoryCacheStore {
    slots: DashMap<CacheKey, CacheEntry>,
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn lookup(&self, key: CacheKey) -> Result<Option<CacheEntry>, Error> {
        let Some(entry) = self.slots.get(&key) else {
            return Ok(None);
        };
        if entry.is_expired(Utc::now()) {
            drop(entry);
            self.slots.remove(&key);
            return Ok(None);
        }
        Ok(Some(*entry))
    }

    async fn store(&self, key: CacheKey, execution_id: ExecutionId, ttl: Duration) -> Result<(), Error> {
        self.slots
            .entry(key)
            .and_modify(|entry| {
                entry.execution_id = execution_id;
                entry.expires_at = Utc::now() + ttl;
            })
            .or_insert(CacheEntry { execution_id, expires_at: Utc::now() + ttl, hit_count: 0 });
        Ok(())
    }

    async fn increment_hit(&self, key: CacheKey) -> Result<(), Error> {
        if let Some(mut entry) = self.slots.get_mut(&key) {
            entry.hit_count += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::ToolVersionId;
    use crucible_execution::{ExecutionStatus, InputHash};
    use semver::Version;
    use serde_json::json;

    fn sample_record() -> ExecutionRecord {
        ExecutionRecord::new(
            ExecutionId::v4(),
            crucible_core::ToolName::parse("t.echo").unwrap(),
            Version::parse("1.0.0").unwrap(),
            ToolVersionId::v4(),
            crucible_core::RunId::v4(),
            None,
            None,
            None,
            None,
            InputHash::compute(
                &crucible_core::ToolName::parse("t.echo").unwrap(),
                &Version::parse("1.0.0").unwrap(),
                &json!({}),
            ),
            json!({}),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryExecutionStore::default();
        let record = sample_record();
        let id = record.id;
        store.create(record).await.unwrap();
        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn creating_the_same_id_twice_fails() {
        let store = InMemoryExecutionStore::default();
        let record = sample_record();
        store.create(record.clone()).await.unwrap();
        assert!(store.create(record).await.is_err());
    }

    #[tokio::test]
    async fn complete_on_unknown_id_is_not_found() {
        let store = InMemoryExecutionStore::default();
        let fields = TerminalFields {
            status: ExecutionStatus::Succeeded,
            output: Some(json!({})),
            error: None,
            duration_ms: 1,
            cpu_ms: None,
            memory_peak_bytes: None,
            exit_code: Some(0),
            retry_count: 0,
            completed_at: Utc::now(),
        };
        let err = store.complete(ExecutionId::v4(), fields).await.unwrap_err();
        assert_eq!(err.wire_type(), "not_found");
    }

    #[tokio::test]
    async fn cache_lookup_treats_expired_slot_as_absent() {
        let store = InMemoryCacheStore::default();
        let key = CacheKey::new(ToolVersionId::v4(), InputHash::compute(
            &crucible_core::ToolName::parse("t.echo").unwrap(),
            &Version::parse("1.0.0").unwrap(),
            &json!({}),
        ));
        store.store(key, ExecutionId::v4(), Duration::seconds(-1)).await.unwrap();
        assert!(store.lookup(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_store_is_an_upsert() {
        let store = InMemoryCacheStore::default();
        let key = CacheKey::new(ToolVersionId::v4(), InputHash::compute(
            &crucible_core::ToolName::parse("t.echo").unwrap(),
            &Version::parse("1.0.0").unwrap(),
            &json!({}),
        ));
        let first_id = ExecutionId::v4();
        let second_id = ExecutionId::v4();
        store.store(key, first_id, Duration::minutes(10)).await.unwrap();
        store.store(key, second_id, Duration::minutes(10)).await.unwrap();
        let entry = store.lookup(key).await.unwrap().unwrap();
        assert_eq!(entry.execution_id, second_id);
    }

    #[tokio::test]
    async fn increment_hit_bumps_the_counter() {
        let store = InMemoryCacheStore::default();
        let key = CacheKey::new(ToolVersionId::v4(), InputHash::compute(
            &crucible_core::ToolName::parse("t.echo").unwrap(),
            &Version::parse("1.0.0").unwrap(),
            &json!({}),
        ));
        store.store(key, ExecutionId::v4(), Duration::minutes(10)).await.unwrap();
        store.increment_hit(key).await.unwrap();
        store.increment_hit(key).await.unwrap();
        assert_eq!(store.lookup(key).await.unwrap().unwrap().hit_count, 2);
    }
}
