//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite-backed artifact store and score sink
//! - `records`: JSON-file record source, plus an in-memory source for tests

pub mod records;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
