use async_trait::async_trait;
use domain::{DomainError, Record, RecordId};
use serde::Serialize;
use thiserror::Error;

pub mod seeder;
pub mod service;
#[cfg(test)]
mod test_support;

pub use seeder::{RetryPolicy, SeedError, Seeder, load_seed_records};
pub use service::{ReplaceEcho, ResourceService};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),
    #[error("Record already exists: {0}")]
    AlreadyExists(RecordId),
    /// The backing medium could not be reached (connection refused, timeout, ...).
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
}

impl ApplicationError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApplicationError::Unavailable(_))
    }
}

// --- Infrastructure Interfaces (Traits) ---

/// CRUD primitives over one collection of uniquely-`id`'d records.
///
/// Implementations own their collection exclusively. Every method must be safe
/// to call concurrently from request handlers.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Short backend label used in logs ("memory", "document").
    fn backend_name(&self) -> &'static str;
    /// Current number of records.
    async fn count(&self) -> Result<usize, ApplicationError>;
    /// All records. No ordering is guaranteed.
    async fn list_all(&self) -> Result<Vec<Record>, ApplicationError>;
    /// The record with the given id, if any.
    async fn get(&self, id: RecordId) -> Result<Option<Record>, ApplicationError>;
    /// Appends a record, failing with `AlreadyExists` if its id is taken.
    /// Returns the record unchanged.
    async fn insert(&self, record: Record) -> Result<Record, ApplicationError>;
    /// Replaces the record with the given id wholesale.
    /// Returns the record as it was before the call, or `None` if absent.
    async fn replace(&self, id: RecordId, record: Record)
    -> Result<Option<Record>, ApplicationError>;
    /// Removes the record with the given id, returning it.
    async fn delete(&self, id: RecordId) -> Result<Option<Record>, ApplicationError>;
    /// Clears the collection, then inserts `records` in order.
    async fn reset(&self, records: Vec<Record>) -> Result<(), ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "OK" }
    }
}
