// Module declarations
pub mod connection;
pub mod marshal;
pub mod persistence;

// Re-export all implementations
pub use connection::{ConnectionDescriptor, ConnectionSettings, Credentials};
pub use persistence::{DocumentStore, InMemoryStore, connect};
