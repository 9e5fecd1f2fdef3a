// ./api/src/lib.rs
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::get,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

use application::{ApplicationError, ResourceService, ResourceStore, Seeder, load_seed_records};
use domain::{Record, RecordId};
use infrastructure::{DocumentStore, InMemoryStore, connect};

pub mod config;

pub use config::{AppConfig, ServiceProfile, StoreBackend};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ResourceService>,
    profile: Arc<ServiceProfile>,
}

impl AppState {
    pub fn new(service: Arc<ResourceService>, profile: ServiceProfile) -> Self {
        Self {
            service,
            profile: Arc::new(profile),
        }
    }
}

/// Builds the store selected by `config` and brings it to its seeded state.
///
/// The in-memory backend loads the seed file straight into its collection. The
/// document backend connects (with retries), then drops and re-seeds its
/// collection. Connection faults are returned; an unusable seed file is not.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn ResourceStore>, ApplicationError> {
    match config.backend {
        StoreBackend::Memory => {
            let records = match load_seed_records(&config.seed_file).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("{}; starting with an empty collection", e);
                    Vec::new()
                }
            };
            info!(count = records.len(), "In-memory store initialized.");
            Ok(Arc::new(InMemoryStore::with_records(records)))
        }
        StoreBackend::Document => {
            let descriptor = config.connection.resolve();
            info!(uri = %descriptor, "Connecting to document store");
            let database = connect(&descriptor, config.store_timeout, &config.seed_retry).await?;
            let store = DocumentStore::from_database(&database, &config.collection);
            Seeder::new(config.seed_retry.clone())
                .bootstrap(&store, &config.seed_file)
                .await?;
            info!(collection = %config.collection, "Document store initialized.");
            Ok(Arc::new(store))
        }
    }
}

/// Mounts `/health`, `/count` and the resource routes for `state`'s profile.
/// Write routes are only mounted for writable profiles.
pub fn build_router(state: AppState) -> Router {
    let collection_path = format!("/{}", state.profile.resource);
    let item_path = format!("/{}/:id", state.profile.resource);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/count", get(count_handler));

    let router = if state.profile.writable {
        router
            .route(&collection_path, get(list_handler).post(create_handler))
            .route(
                &item_path,
                get(get_handler).put(update_handler).delete(delete_handler),
            )
    } else {
        router
            .route(&collection_path, get(list_handler))
            .route(&item_path, get(get_handler))
    };

    router.with_state(state)
}

// --- API Handlers ---

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, JsonResponse(state.service.health()))
}

async fn count_handler(State(state): State<AppState>) -> Response {
    match state.service.count().await {
        Ok(total) => {
            let mut body = Map::new();
            body.insert(state.profile.count_field.clone(), json!(total));
            (StatusCode::OK, JsonResponse(Value::Object(body))).into_response()
        }
        Err(e) => {
            error!("Failed to count records via handler: {}", e);
            map_application_error_to_response(&state.profile.resource, e)
        }
    }
}

async fn list_handler(State(state): State<AppState>) -> Response {
    match state.service.list_all().await {
        Ok(records) => {
            let records: Vec<Value> = records.into_iter().map(Record::into_value).collect();
            let body = match &state.profile.list_envelope {
                Some(envelope) => {
                    let mut wrapped = Map::new();
                    wrapped.insert(envelope.clone(), Value::Array(records));
                    Value::Object(wrapped)
                }
                None => Value::Array(records),
            };
            (StatusCode::OK, JsonResponse(body)).into_response()
        }
        Err(e) => {
            error!("Failed to list records via handler: {}", e);
            map_application_error_to_response(&state.profile.resource, e)
        }
    }
}

async fn get_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.get(RecordId::new(id)).await {
        Ok(record) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Err(e) => map_application_error_to_response(&state.profile.resource, e),
    }
}

async fn create_handler(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    match state.service.create(payload).await {
        Ok(record) => (StatusCode::CREATED, JsonResponse(record)).into_response(),
        Err(e) => map_application_error_to_response(&state.profile.resource, e),
    }
}

async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> Response {
    match state.service.update(RecordId::new(id), payload).await {
        Ok(record) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Err(e) => map_application_error_to_response(&state.profile.resource, e),
    }
}

async fn delete_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.delete(RecordId::new(id)).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_application_error_to_response(&state.profile.resource, e),
    }
}

/// Maps ApplicationError onto an HTTP status and a `{"Message": ...}` body.
fn map_application_error_to_response(resource: &str, err: ApplicationError) -> Response {
    let (status, message) = match err {
        ApplicationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("{} with id {} not found", resource, id),
        ),
        // Duplicate creates answer 302 Found, pointing at the existing record.
        ApplicationError::AlreadyExists(id) => (
            StatusCode::FOUND,
            format!("{} with id {} already present", resource, id),
        ),
        ApplicationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            (StatusCode::BAD_REQUEST, domain_err.to_string())
        }
        ApplicationError::Unavailable(msg) => {
            error!("Storage backend unavailable: {}", msg);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage backend unavailable".to_string(),
            )
        }
        ApplicationError::Storage(msg) => {
            error!("Underlying storage error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };
    (status, JsonResponse(json!({ "Message": message }))).into_response()
}
