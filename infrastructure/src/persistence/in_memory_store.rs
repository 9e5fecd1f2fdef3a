// ./infrastructure/src/persistence/in_memory_store.rs
use application::{ApplicationError, ResourceStore};
use async_trait::async_trait;
use domain::{Record, RecordId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Ephemeral, process-local collection.
///
/// Records live in an ordered `Vec` and every operation is a linear scan. A
/// single lock guards the whole sequence: readers share it, and every mutation
/// (including the duplicate check that precedes an insert) runs under one
/// write guard.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `records`, in order.
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.records.read().await.len())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Record>, ApplicationError> {
        let records = self.records.read().await;
        debug!(count = records.len(), "Listing records from in-memory store");
        Ok(records.clone())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        debug!(id = %id, "Getting record from in-memory store");
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.id() == id).cloned())
    }

    #[instrument(skip(self, record), fields(id = %record.id()))]
    async fn insert(&self, record: Record) -> Result<Record, ApplicationError> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(ApplicationError::AlreadyExists(record.id()));
        }
        debug!("Appending record to in-memory store");
        records.push(record.clone());
        Ok(record)
    }

    #[instrument(skip(self, record))]
    async fn replace(
        &self,
        id: RecordId,
        record: Record,
    ) -> Result<Option<Record>, ApplicationError> {
        let mut records = self.records.write().await;
        let previous = records
            .iter_mut()
            .find(|existing| existing.id() == id)
            .map(|slot| std::mem::replace(slot, record));
        debug!(id = %id, replaced = previous.is_some(), "Replace in in-memory store");
        Ok(previous)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        let mut records = self.records.write().await;
        let position = records.iter().position(|existing| existing.id() == id);
        let removed = position.map(|index| records.remove(index));
        debug!(id = %id, removed = removed.is_some(), "Delete from in-memory store");
        Ok(removed)
    }

    #[instrument(skip(self, seed), fields(seed_size = seed.len()))]
    async fn reset(&self, seed: Vec<Record>) -> Result<(), ApplicationError> {
        *self.records.write().await = seed;
        Ok(())
    }
}
