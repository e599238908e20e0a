//! Versioned directed edges.
//!
//! Edges point from `source` to `target`. Parallel edges between the same
//! ordered pair are allowed; self-loops are rejected by the graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::data::{Data, ElementType};
use crate::id::Locator;
use crate::node::Node;
use crate::reference::{Kind, Reference};
use crate::version::{Locatable, Timestamp, Versioned};

/// One immutable version of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub locator: Locator,
    pub edge_type: ElementType,
    pub source: Reference<Node>,
    pub target: Reference<Node>,
    pub data: Data,
    pub components: HashSet<Reference<Component>>,
    pub created: Timestamp,
    pub expired: Option<Timestamp>,
}

impl Edge {
    /// A fresh, active edge version with the default type tag.
    pub fn new(
        locator: Locator,
        source: Reference<Node>,
        target: Reference<Node>,
        data: Data,
        created: Timestamp,
    ) -> Self {
        Edge {
            locator,
            edge_type: ElementType::edge(),
            source,
            target,
            data,
            components: HashSet::new(),
            created,
            expired: None,
        }
    }

    /// Copy of this version closed at `timestamp`.
    pub fn expire_at(&self, timestamp: Timestamp) -> Edge {
        Edge {
            expired: Some(timestamp),
            ..self.clone()
        }
    }

    /// Persistent form: every nested reference is lazy.
    pub fn detached(&self) -> Edge {
        Edge {
            source: self.source.unload(),
            target: self.target.unload(),
            components: self.components.iter().map(Reference::unload).collect(),
            ..self.clone()
        }
    }
}

impl Locatable for Edge {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn kind(&self) -> Kind {
        Kind::Edge
    }
}

impl Versioned for Edge {
    fn created(&self) -> Timestamp {
        self.created
    }

    fn expired(&self) -> Option<Timestamp> {
        self.expired
    }
}
