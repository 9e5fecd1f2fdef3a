// ./infrastructure/src/persistence/document_store.rs
use crate::connection::ConnectionDescriptor;
use crate::marshal::{to_transport, writable_document};
use application::{ApplicationError, ResourceStore, RetryPolicy};
use async_trait::async_trait;
use bson::{Document, doc};
use domain::{Record, RecordId};
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const APP_NAME: &str = "records-service";

/// Maps a driver error onto the application taxonomy: anything that means the
/// server could not be reached is `Unavailable`, the rest is `Storage`.
pub fn map_driver_error(err: DriverError) -> ApplicationError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. } => ApplicationError::Unavailable(err.to_string()),
        _ => ApplicationError::Storage(err.to_string()),
    }
}

/// Opens a client for `descriptor` and pings its database until it answers or
/// the retry policy is exhausted.
///
/// `timeout` bounds both connection establishment and server selection, so
/// later store operations fail instead of hanging when the server goes away.
#[instrument(skip(descriptor, policy), fields(uri = %descriptor))]
pub async fn connect(
    descriptor: &ConnectionDescriptor,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<Database, ApplicationError> {
    let mut options = ClientOptions::parse(descriptor.uri()).await.map_err(|e| {
        ApplicationError::Unavailable(format!("invalid connection string: {}", e))
    })?;
    options.app_name = Some(APP_NAME.to_string());
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);

    let client = Client::with_options(options).map_err(map_driver_error)?;
    let database = client.database(descriptor.database());

    let mut attempt = 1;
    loop {
        match database.run_command(doc! {"ping": 1}, None).await {
            Ok(_) => {
                info!(database = %descriptor.database(), "Connected to document store");
                return Ok(database);
            }
            Err(e) => {
                let err = map_driver_error(e);
                if !err.is_transient() || attempt >= policy.max_attempts() {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(attempt, ?delay, "Document store not reachable yet: {}", err);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Networked collection in a document database.
///
/// Lookups are field-equality queries on the public `id`; the store's own
/// `_id` is left to the server and only ever surfaces in its tagged form.
/// Every operation is individually atomic at the document level.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    collection: Collection<Document>,
}

impl DocumentStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    pub fn from_database(database: &Database, collection_name: &str) -> Self {
        Self::new(database.collection::<Document>(collection_name))
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn id_filter(id: RecordId) -> Document {
        doc! {"id": id.value()}
    }
}

#[async_trait]
impl ResourceStore for DocumentStore {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    async fn count(&self) -> Result<usize, ApplicationError> {
        let total = self
            .collection
            .count_documents(doc! {}, None)
            .await
            .map_err(map_driver_error)?;
        Ok(total as usize)
    }

    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    async fn list_all(&self) -> Result<Vec<Record>, ApplicationError> {
        let mut cursor = self
            .collection
            .find(doc! {}, None)
            .await
            .map_err(map_driver_error)?;
        let mut records = Vec::new();
        while cursor.advance().await.map_err(map_driver_error)? {
            let document = cursor.deserialize_current().map_err(map_driver_error)?;
            match to_transport(document) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping stored document: {}", e),
            }
        }
        debug!(count = records.len(), "Listed documents");
        Ok(records)
    }

    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    async fn get(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        self.collection
            .find_one(Self::id_filter(id), None)
            .await
            .map_err(map_driver_error)?
            .map(to_transport)
            .transpose()
    }

    #[instrument(skip(self, record), fields(collection = %self.collection_name(), id = %record.id()))]
    async fn insert(&self, record: Record) -> Result<Record, ApplicationError> {
        let id = record.id();
        let existing = self
            .collection
            .find_one(Self::id_filter(id), None)
            .await
            .map_err(map_driver_error)?;
        if existing.is_some() {
            return Err(ApplicationError::AlreadyExists(id));
        }
        let document = writable_document(&record)?;
        self.collection
            .insert_one(document, None)
            .await
            .map_err(map_driver_error)?;
        debug!("Inserted document");
        Ok(record)
    }

    #[instrument(skip(self, record), fields(collection = %self.collection_name()))]
    async fn replace(
        &self,
        id: RecordId,
        record: Record,
    ) -> Result<Option<Record>, ApplicationError> {
        let replacement = writable_document(&record)?;
        // Default options hand back the document as it was before the replace.
        self.collection
            .find_one_and_replace(Self::id_filter(id), replacement, None)
            .await
            .map_err(map_driver_error)?
            .map(to_transport)
            .transpose()
    }

    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    async fn delete(&self, id: RecordId) -> Result<Option<Record>, ApplicationError> {
        self.collection
            .find_one_and_delete(Self::id_filter(id), None)
            .await
            .map_err(map_driver_error)?
            .map(to_transport)
            .transpose()
    }

    #[instrument(skip(self, seed), fields(collection = %self.collection_name(), seed_size = seed.len()))]
    async fn reset(&self, seed: Vec<Record>) -> Result<(), ApplicationError> {
        self.collection.drop(None).await.map_err(map_driver_error)?;
        if seed.is_empty() {
            return Ok(());
        }
        let documents = seed
            .iter()
            .map(writable_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.collection
            .insert_many(documents, None)
            .await
            .map_err(map_driver_error)?;
        Ok(())
    }
}
