pub mod document_store;
pub mod in_memory_store;

// Re-export both store types
pub use document_store::{DocumentStore, connect, map_driver_error};
pub use in_memory_store::InMemoryStore;
