//! The persisted audit trail (§4.7 [ADDED]): one `JournalEntry` per
//! orchestration stage, independent of the `tracing` span events emitted
//! alongside them.

use async_trait::async_trait;
use crucible_execution::JournalEntry;

/// Where orchestration stage entries go. Kept separate from
/// `crucible_store::ExecutionStore` since a journal sink may reasonably be
/// append-only storage (a log topic, a flat file) rather than a queryable
/// table.
#[async_trait]
pub trait JournalSink: Send + Sync {
    async fn record(&self, entry: JournalEntry);
}

/// Discards every entry. Used when no audit sink is configured.
pub struct NullJournalSink;

#[async_trait]
impl JournalSink for NullJournalSink {
    async fn record(&self, _entry: JournalEntry) {}
}

/// Keeps every entry in memory, for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryJournalSink {
    entries: std::sync::Mutex<Vec<JournalEntry>>,
}

impl InMemoryJournalSink {
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl JournalSink for InMemoryJournalSink {
    async fn record(&self, entry: JournalEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::ExecutionId;
    use crucible_execution::Stage;

    #[tokio::test]
    async fn null_sink_drops_everything() {
        let sink = NullJournalSink;
        sink.record(JournalEntry::new(ExecutionId::v4(), Stage::Resolve, "x", chrono::Utc::now())).await;
    }

    #[tokio::test]
    async fn in_memory_sink_accumulates_in_order() {
        let sink = InMemoryJournalSink::default();
        let id = ExecutionId::v4();
        sink.record(JournalEntry::new(id, Stage::CacheLookup, "miss", chrono::Utc::now())).await;
        sink.record(JournalEntry::new(id, Stage::Resolve, "ok", chrono::Utc::now())).await;
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, Stage::CacheLookup);
        assert_eq!(entries[1].stage, Stage::Resolve);
    }
}
