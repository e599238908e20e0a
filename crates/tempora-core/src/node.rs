//! Versioned graph vertices.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::data::{Data, ElementType};
use crate::edge::Edge;
use crate::id::Locator;
use crate::reference::{Kind, Reference};
use crate::version::{Locatable, Timestamp, Versioned};

/// One immutable version of a vertex.
///
/// `edges` is only populated for expired versions, where it holds lazy
/// handles to the edges that touched this version. Live versions find their
/// edges through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub locator: Locator,
    pub node_type: ElementType,
    pub data: Data,
    pub edges: Vec<Reference<Edge>>,
    pub components: HashSet<Reference<Component>>,
    pub created: Timestamp,
    pub expired: Option<Timestamp>,
}

impl Node {
    /// A fresh, active node version with the default type tag.
    pub fn new(locator: Locator, data: Data, created: Timestamp) -> Self {
        Node {
            locator,
            node_type: ElementType::node(),
            data,
            edges: Vec::new(),
            components: HashSet::new(),
            created,
            expired: None,
        }
    }

    /// Copy of this version closed at `timestamp`.
    ///
    /// The edge list is coerced to lazy handles.
    pub fn expire_at(&self, timestamp: Timestamp) -> Node {
        Node {
            edges: self.edges.iter().map(Reference::unload).collect(),
            expired: Some(timestamp),
            ..self.clone()
        }
    }

    /// Persistent form: every nested reference is lazy.
    pub fn detached(&self) -> Node {
        Node {
            edges: self.edges.iter().map(Reference::unload).collect(),
            components: self.components.iter().map(Reference::unload).collect(),
            ..self.clone()
        }
    }
}

impl Locatable for Node {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn kind(&self) -> Kind {
        Kind::Node
    }
}

impl Versioned for Node {
    fn created(&self) -> Timestamp {
        self.created
    }

    fn expired(&self) -> Option<Timestamp> {
        self.expired
    }
}
