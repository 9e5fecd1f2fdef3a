use crate::{ApplicationError, HealthResponse, ResourceStore};
use domain::{Record, RecordId};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Which record an update echoes back to the caller.
///
/// `Previous` reproduces the long-standing behaviour of the pictures service,
/// where a successful PUT answers with the record as it was *before* the
/// replace. `Updated` answers with the record that was just stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceEcho {
    #[default]
    Previous,
    Updated,
}

impl FromStr for ReplaceEcho {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "previous" => Ok(ReplaceEcho::Previous),
            "updated" => Ok(ReplaceEcho::Updated),
            other => Err(format!(
                "unknown replace echo '{}', expected 'previous' or 'updated'",
                other
            )),
        }
    }
}

impl fmt::Display for ReplaceEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceEcho::Previous => f.write_str("previous"),
            ReplaceEcho::Updated => f.write_str("updated"),
        }
    }
}

/// CRUD use cases for one resource type, backed by exactly one store.
pub struct ResourceService {
    resource: String,
    store: Arc<dyn ResourceStore>,
    replace_echo: ReplaceEcho,
}

impl ResourceService {
    pub fn new(
        resource: impl Into<String>,
        store: Arc<dyn ResourceStore>,
        replace_echo: ReplaceEcho,
    ) -> Self {
        Self {
            resource: resource.into(),
            store,
            replace_echo,
        }
    }

    /// Singular resource name, e.g. "picture".
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse::ok()
    }

    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn count(&self) -> Result<usize, ApplicationError> {
        let total = self.store.count().await?;
        debug!(total, "Counted records");
        Ok(total)
    }

    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn list_all(&self) -> Result<Vec<Record>, ApplicationError> {
        self.store.list_all().await
    }

    #[instrument(skip(self), fields(resource = %self.resource, id = %id))]
    pub async fn get(&self, id: RecordId) -> Result<Record, ApplicationError> {
        self.store.get(id).await?.ok_or_else(|| {
            debug!("Record not found");
            ApplicationError::NotFound(id)
        })
    }

    /// Validates `payload` as a record and inserts it. The stored record is
    /// returned unchanged.
    #[instrument(skip(self, payload), fields(resource = %self.resource))]
    pub async fn create(&self, payload: Value) -> Result<Record, ApplicationError> {
        let record = Record::try_from(payload)?;
        let id = record.id();
        match self.store.insert(record).await {
            Ok(created) => {
                info!(id = %id, "Record created");
                Ok(created)
            }
            Err(e @ ApplicationError::AlreadyExists(_)) => {
                warn!(id = %id, "Create rejected: id already present");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the record stored under `id` with `payload`.
    ///
    /// The payload's own `id` must match the path id so the identity of the
    /// collection never changes through an update.
    #[instrument(skip(self, payload), fields(resource = %self.resource, id = %id))]
    pub async fn update(&self, id: RecordId, payload: Value) -> Result<Record, ApplicationError> {
        let record = Record::try_from(payload)?;
        if record.id() != id {
            return Err(ApplicationError::InvalidInput(format!(
                "body id {} does not match path id {}",
                record.id(),
                id
            )));
        }
        let echo = match self.replace_echo {
            ReplaceEcho::Previous => None,
            ReplaceEcho::Updated => Some(record.clone()),
        };
        let previous = self
            .store
            .replace(id, record)
            .await?
            .ok_or(ApplicationError::NotFound(id))?;
        info!("Record replaced");
        Ok(echo.unwrap_or(previous))
    }

    /// Removes the record stored under `id`, returning it.
    #[instrument(skip(self), fields(resource = %self.resource, id = %id))]
    pub async fn delete(&self, id: RecordId) -> Result<Record, ApplicationError> {
        let removed = self
            .store
            .delete(id)
            .await?
            .ok_or(ApplicationError::NotFound(id))?;
        info!("Record deleted");
        Ok(removed)
    }
}
