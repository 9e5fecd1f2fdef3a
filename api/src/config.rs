// ./api/src/config.rs
use application::{ReplaceEcho, RetryPolicy};
use infrastructure::ConnectionSettings;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SEED_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_SEED_RETRY_BASE_MS: u64 = 200;
const DEFAULT_SEED_RETRY_MAX_MS: u64 = 2000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Which persistence model backs the collection. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Document,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "document" | "mongo" | "mongodb" => Ok(StoreBackend::Document),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("memory"),
            StoreBackend::Document => f.write_str("document"),
        }
    }
}

/// Static, per-service shape of the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProfile {
    /// Singular resource name, also the route prefix (`/picture`).
    pub resource: String,
    /// Collection name in the document store.
    pub collection: String,
    /// Key of the `/count` response body.
    pub count_field: String,
    /// When set, list responses are wrapped as `{<envelope>: [...]}`.
    pub list_envelope: Option<String>,
    /// Whether POST/PUT/DELETE routes are mounted.
    pub writable: bool,
    pub default_backend: StoreBackend,
    pub default_seed_file: PathBuf,
}

impl ServiceProfile {
    pub fn pictures() -> Self {
        Self {
            resource: "picture".to_string(),
            collection: "pictures".to_string(),
            count_field: "length".to_string(),
            list_envelope: None,
            writable: true,
            default_backend: StoreBackend::Memory,
            default_seed_file: PathBuf::from("data/pictures.json"),
        }
    }

    pub fn songs() -> Self {
        Self {
            resource: "song".to_string(),
            collection: "songs".to_string(),
            count_field: "count".to_string(),
            list_envelope: Some("songs".to_string()),
            writable: false,
            default_backend: StoreBackend::Document,
            default_seed_file: PathBuf::from("data/songs.json"),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pictures" | "picture" => Some(Self::pictures()),
            "songs" | "song" => Some(Self::songs()),
            _ => None,
        }
    }
}

/// Runtime configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub profile: ServiceProfile,
    pub backend: StoreBackend,
    pub seed_file: PathBuf,
    pub collection: String,
    pub replace_echo: ReplaceEcho,
    pub seed_retry: RetryPolicy,
    pub store_timeout: Duration,
    pub connection: ConnectionSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut profile = match read("SERVICE") {
            Some(name) => ServiceProfile::by_name(&name).unwrap_or_else(|| {
                warn!(
                    "Unknown SERVICE value '{}'. Using the pictures service.",
                    name
                );
                ServiceProfile::pictures()
            }),
            None => ServiceProfile::pictures(),
        };
        profile.writable = parse_or(&read, "WRITES_ENABLED", profile.writable);

        let backend = parse_or(&read, "STORE_BACKEND", profile.default_backend);
        let seed_file = read("SEED_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| profile.default_seed_file.clone());
        let collection = read("MONGO_COLLECTION").unwrap_or_else(|| profile.collection.clone());

        let seed_retry = RetryPolicy::new(
            parse_or(&read, "SEED_RETRY_ATTEMPTS", DEFAULT_SEED_RETRY_ATTEMPTS),
            Duration::from_millis(parse_or(&read, "SEED_RETRY_BASE_MS", DEFAULT_SEED_RETRY_BASE_MS)),
            Duration::from_millis(parse_or(&read, "SEED_RETRY_MAX_MS", DEFAULT_SEED_RETRY_MAX_MS)),
        );

        Self {
            port: parse_or(&read, "PORT", DEFAULT_PORT),
            backend,
            seed_file,
            collection,
            replace_echo: parse_or(&read, "REPLACE_ECHO", ReplaceEcho::default()),
            seed_retry,
            store_timeout: Duration::from_millis(parse_or(
                &read,
                "MONGO_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT_MS,
            )),
            connection: ConnectionSettings::from_lookup(&lookup),
            profile,
        }
    }
}

/// Parses `key`, falling back to `default` (with a warning) when it is unset or invalid.
fn parse_or<T, R>(read: &R, key: &str, default: T) -> T
where
    T: FromStr + Display,
    R: Fn(&str) -> Option<String>,
{
    match read(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => {
                info!("Using {} = {} from environment.", key, value);
                value
            }
            Err(_) => {
                warn!(
                    "Invalid {} value '{}' in environment. Using default {}.",
                    key, raw, default
                );
                default
            }
        },
        None => default,
    }
}
