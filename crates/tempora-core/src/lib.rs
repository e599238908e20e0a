//! Bitemporal versioned property graph.
//!
//! Nodes, edges, and components are immutable versions with a
//! `(created, expired)` validity interval. Changes never rewrite history: an
//! update expires the active version and adds the next one.
//! [`VersionedGraph`] holds the live graph and emits [`GraphEvent`]s for
//! persistence.

pub mod component;
pub mod data;
pub mod edge;
pub mod element;
pub mod error;
pub mod event;
pub mod graph;
pub mod id;
pub mod node;
pub mod path;
pub mod reference;
pub mod version;

// Re-export commonly used types
pub use component::Component;
pub use data::{Data, ElementType};
pub use edge::Edge;
pub use element::Element;
pub use error::{CoreError, ValidationError};
pub use event::{GraphChangeSink, GraphEvent};
pub use graph::VersionedGraph;
pub use id::{Locator, NanoId};
pub use node::Node;
pub use path::Path;
pub use reference::{Kind, Reference};
pub use version::{Locatable, Timestamp, Versioned};
