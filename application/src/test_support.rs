//! Minimal stores for exercising services without real infrastructure.

use crate::{ApplicationError, ResourceStore};
use async_trait::async_trait;
use domain::{Record, RecordId};
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct VecStore {
    records: Mutex<Vec<Record>>,
}

impl VecStore {
    pub fn with(values: Vec<Value>) -> Self {
        let records = values
            .into_iter()
            .map(|v| Record::try_from(v).unwrap())
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl ResourceStore for VecStore {
    fn backend_name(&self) -> &'static str {
        "test-vec"
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.records.lock().unwrap().len())
    }

    async fn list_all(&self) -> Result<Vec<Record>, ApplicationError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn insert(&self, record: Record) -> Result<Record, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(ApplicationError::AlreadyExists(record.id()));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        id: RecordId,
        record: Record,
    ) -> Result<Option<Record>, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        Ok(records
            .iter_mut()
            .find(|r| r.id() == id)
            .map(|slot| std::mem::replace(slot, record)))
    }

    async fn delete(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        let position = records.iter().position(|r| r.id() == id);
        Ok(position.map(|index| records.remove(index)))
    }

    async fn reset(&self, records: Vec<Record>) -> Result<(), ApplicationError> {
        *self.records.lock().unwrap() = records;
        Ok(())
    }
}

/// Fails every call with `Unavailable` until `failures` resets have been attempted.
pub struct FlakyStore {
    failures: u32,
    resets: AtomicU32,
    inner: VecStore,
}

impl FlakyStore {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            resets: AtomicU32::new(0),
            inner: VecStore::default(),
        }
    }

    pub fn reset_calls(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }

    fn unavailable() -> ApplicationError {
        ApplicationError::Unavailable("connection refused".to_string())
    }
}

#[async_trait]
impl ResourceStore for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "test-flaky"
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn list_all(&self) -> Result<Vec<Record>, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn get(&self, _id: RecordId) -> Result<Option<Record>, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn insert(&self, _record: Record) -> Result<Record, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn replace(
        &self,
        _id: RecordId,
        _record: Record,
    ) -> Result<Option<Record>, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn delete(&self, _id: RecordId) -> Result<Option<Record>, ApplicationError> {
        Err(Self::unavailable())
    }

    async fn reset(&self, records: Vec<Record>) -> Result<(), ApplicationError> {
        let attempt = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(Self::unavailable());
        }
        self.inner.reset(records).await
    }
}
