//! Service layer over a persisted versioned graph.
//!
//! [`GraphService`] owns the live [`VersionedGraph`](tempora_core::VersionedGraph)
//! and a [`GraphStore`](tempora_storage::GraphStore). Mutations are
//! serialized behind one write lock and persisted through the change bridge
//! before the lock is released; queries run concurrently under the read lock.
//!
//! # Modules
//!
//! - [`config`]: ServiceConfig and its environment variables
//! - [`error`]: ServiceError with client/internal classification
//! - [`service`]: GraphService and ElementRef

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::{ElementRef, GraphService};
