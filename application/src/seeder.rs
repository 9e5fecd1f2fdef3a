//! Startup bootstrap: load a static seed file and reset a store to it.

use crate::{ApplicationError, ResourceStore};
use domain::Record;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Reasons a seed file could not be used. Never fatal: callers degrade to an
/// empty seed set.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Seed file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Seed file {} could not be read: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Seed file {} is not valid JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Seed file {} must contain a JSON array", .0.display())]
    NotAnArray(PathBuf),
}

/// Reads a JSON array of records from `path`.
///
/// Entries that are not valid records are skipped. When several entries share
/// an id only the first one is kept.
#[instrument]
pub async fn load_seed_records(path: &Path) -> Result<Vec<Record>, SeedError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SeedError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(SeedError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let parsed: Value = serde_json::from_slice(&bytes).map_err(|source| SeedError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(entries) = parsed else {
        return Err(SeedError::NotAnArray(path.to_path_buf()));
    };
    Ok(records_from_values(entries))
}

fn records_from_values(entries: Vec<Value>) -> Vec<Record> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match Record::try_from(entry) {
            Ok(record) => {
                if seen.insert(record.id()) {
                    records.push(record);
                } else {
                    warn!(position, id = %record.id(), "Skipping seed entry with duplicate id");
                }
            }
            Err(e) => warn!(position, "Skipping invalid seed entry: {}", e),
        }
    }
    records
}

/// Bounded exponential backoff for transient store faults.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_max,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200), Duration::from_secs(2))
    }
}

/// Resets a store's collection to a known record set.
#[derive(Debug, Clone, Default)]
pub struct Seeder {
    policy: RetryPolicy,
}

impl Seeder {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Clears the collection and inserts `records` in order, retrying
    /// transient faults. Returns the number of records seeded.
    #[instrument(skip(self, store, records), fields(backend = store.backend_name(), seed_size = records.len()))]
    pub async fn seed(
        &self,
        store: &dyn ResourceStore,
        records: Vec<Record>,
    ) -> Result<usize, ApplicationError> {
        let seed_size = records.len();
        let mut attempt = 1;
        loop {
            match store.reset(records.clone()).await {
                Ok(()) => {
                    info!(seed_size, "Collection reset to seed records");
                    return Ok(seed_size);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts() => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(attempt, ?delay, "Seeding failed, retrying: {}", e);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Loads the seed file at `path` and seeds `store` with it. An unusable seed
    /// file is logged and results in an empty collection.
    pub async fn bootstrap(
        &self,
        store: &dyn ResourceStore,
        path: &Path,
    ) -> Result<usize, ApplicationError> {
        let records = match load_seed_records(path).await {
            Ok(records) => {
                debug!(path = %path.display(), count = records.len(), "Seed file loaded");
                records
            }
            Err(e) => {
                warn!("{}; starting with an empty collection", e);
                Vec::new()
            }
        };
        self.seed(store, records).await
    }
}
