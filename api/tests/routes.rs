use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use api::{AppConfig, AppState, ServiceProfile, StoreBackend, build_router, open_store};
use application::{ReplaceEcho, ResourceService, ResourceStore};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use domain::Record;
use infrastructure::InMemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt; // for `oneshot`

fn seeded_store() -> Arc<dyn ResourceStore> {
    let records = vec![
        Record::try_from(json!({"id": 1, "title": "A"})).unwrap(),
        Record::try_from(json!({"id": 2, "title": "B"})).unwrap(),
    ];
    Arc::new(InMemoryStore::with_records(records))
}

fn app(profile: ServiceProfile, echo: ReplaceEcho) -> Router {
    let service = Arc::new(ResourceService::new(
        profile.resource.clone(),
        seeded_store(),
        echo,
    ));
    build_router(AppState::new(service, profile))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app(ServiceProfile::pictures(), ReplaceEcho::Previous);
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK"}));
}

#[tokio::test]
async fn pictures_scenario_end_to_end() {
    let app = app(ServiceProfile::pictures(), ReplaceEcho::Previous);

    assert_eq!(send(&app, "GET", "/count", None).await, (StatusCode::OK, json!({"length": 2})));
    assert_eq!(
        send(&app, "GET", "/picture/2", None).await,
        (StatusCode::OK, json!({"id": 2, "title": "B"}))
    );

    let (status, body) = send(&app, "POST", "/picture", Some(json!({"id": 2, "title": "dup"}))).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(body, json!({"Message": "picture with id 2 already present"}));

    let (status, body) = send(&app, "POST", "/picture", Some(json!({"id": 3, "title": "C"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 3, "title": "C"}));
    assert_eq!(send(&app, "GET", "/count", None).await.1, json!({"length": 3}));

    let (status, body) = send(&app, "PUT", "/picture/1", Some(json!({"id": 1, "title": "A2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "title": "A"}));
    assert_eq!(
        send(&app, "GET", "/picture/1", None).await.1,
        json!({"id": 1, "title": "A2"})
    );

    let (status, body) = send(&app, "GET", "/picture/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"Message": "picture with id 99 not found"}));

    let (status, body) = send(&app, "GET", "/picture", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn update_can_echo_updated_record() {
    let app = app(ServiceProfile::pictures(), ReplaceEcho::Updated);
    let (status, body) = send(&app, "PUT", "/picture/1", Some(json!({"id": 1, "title": "A2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "title": "A2"}));
}

#[tokio::test]
async fn invalid_writes_are_rejected() {
    let app = app(ServiceProfile::pictures(), ReplaceEcho::Previous);

    let (status, _) = send(&app, "POST", "/picture", Some(json!({"title": "no id"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "PUT", "/picture/1", Some(json!({"id": 2, "title": "X"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "PUT", "/picture/50", Some(json!({"id": 50}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"Message": "picture with id 50 not found"}));

    let (status, _) = send(&app, "GET", "/picture/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(send(&app, "GET", "/count", None).await.1, json!({"length": 2}));
}

#[tokio::test]
async fn delete_removes_record() {
    let app = app(ServiceProfile::pictures(), ReplaceEcho::Previous);
    let (status, _) = send(&app, "DELETE", "/picture/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(send(&app, "GET", "/picture/1", None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, "DELETE", "/picture/1", None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn songs_profile_is_read_only_with_enveloped_list() {
    let app = app(ServiceProfile::songs(), ReplaceEcho::Previous);

    assert_eq!(send(&app, "GET", "/count", None).await.1, json!({"count": 2}));

    let (status, body) = send(&app, "GET", "/song", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/song/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"Message": "song with id 5 not found"}));

    let (status, _) = send(&app, "POST", "/song", Some(json!({"id": 9}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn memory_backend_opens_with_missing_seed_file() {
    let dir = tempfile::tempdir().unwrap();
    let vars: HashMap<&str, String> = HashMap::from([
        ("STORE_BACKEND", "memory".to_string()),
        (
            "SEED_FILE",
            dir.path().join("no-such-seed.json").display().to_string(),
        ),
    ]);
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned());
    assert_eq!(config.backend, StoreBackend::Memory);

    let store = open_store(&config).await.unwrap();
    assert_eq!(store.backend_name(), "memory");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn memory_backend_loads_seed_file() {
    let mut seed = tempfile::NamedTempFile::new().unwrap();
    seed.write_all(br#"[{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]"#)
        .unwrap();
    let seed_file = seed.path().display().to_string();
    let config = AppConfig::from_lookup(|key| match key {
        "SEED_FILE" => Some(seed_file.clone()),
        _ => None,
    });

    let store = open_store(&config).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}
