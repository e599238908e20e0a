//! What a store needs to know about each persisted entity family.

use serde::de::DeserializeOwned;
use serde::Serialize;

use tempora_core::{Component, Edge, Node, Timestamp, Versioned};

/// A versioned entity that can be written to a [`VersionedStore`](crate::VersionedStore).
pub trait Record: Versioned + Clone + Serialize + DeserializeOwned {
    /// SQLite table holding this family.
    const TABLE: &'static str;

    /// The persistent form: nested references are lazy.
    fn detach(&self) -> Self;

    /// Copy closed at `timestamp`.
    fn close(&self, timestamp: Timestamp) -> Self;
}

impl Record for Node {
    const TABLE: &'static str = "node";

    fn detach(&self) -> Self {
        self.detached()
    }

    fn close(&self, timestamp: Timestamp) -> Self {
        self.expire_at(timestamp)
    }
}

impl Record for Edge {
    const TABLE: &'static str = "edge";

    fn detach(&self) -> Self {
        self.detached()
    }

    fn close(&self, timestamp: Timestamp) -> Self {
        self.expire_at(timestamp)
    }
}

impl Record for Component {
    const TABLE: &'static str = "component";

    fn detach(&self) -> Self {
        self.detached()
    }

    fn close(&self, timestamp: Timestamp) -> Self {
        self.expire_at(timestamp)
    }
}
