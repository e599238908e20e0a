//! Persistence for versioned graph entities.
//!
//! Provides the [`VersionedStore`] and [`GraphStore`] traits defining the
//! storage contract that all backends implement, plus the
//! [`InMemoryGraphStore`] and [`SqliteGraphStore`] as first-class backends.
//!
//! # Architecture
//!
//! Stores hold every version of every node, edge, and component, always in
//! detached form (nested references Unloaded). The live graph never writes to
//! a store directly: its structural events are queued by the
//! [`DelegatedChangeSink`] and flushed as one atomic batch.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`record`]: Record trait tying an entity family to its table
//! - [`traits`]: VersionedStore and GraphStore trait definitions
//! - [`memory`]: InMemoryGraphStore implementation
//! - [`schema`]: migration setup and timestamp encoding
//! - [`sqlite`]: SqliteGraphStore implementation
//! - [`bridge`]: DelegatedChangeSink and PendingWrite

pub mod bridge;
pub mod error;
pub mod memory;
pub mod record;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use bridge::{DelegatedChangeSink, PendingWrite};
pub use error::StorageError;
pub use memory::{InMemoryGraphStore, InMemoryStore};
pub use record::Record;
pub use sqlite::{SqliteGraphStore, SqliteStore};
pub use traits::{GraphStore, VersionedStore};
