//! Versioned groupings of nodes and edges.

use serde::{Deserialize, Serialize};

use crate::data::Data;
use crate::element::Element;
use crate::id::{Locator, NanoId};
use crate::reference::{Kind, Reference};
use crate::version::{Locatable, Timestamp, Versioned};

/// One immutable version of a component.
///
/// The elements of an accepted component form a connected, acyclic, closed
/// sub-graph with at least one node. That is checked when a version is
/// created, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub locator: Locator,
    pub elements: Vec<Reference<Element>>,
    pub data: Data,
    pub created: Timestamp,
    pub expired: Option<Timestamp>,
}

impl Component {
    pub fn new(
        locator: Locator,
        elements: Vec<Reference<Element>>,
        data: Data,
        created: Timestamp,
    ) -> Self {
        Component {
            locator,
            elements,
            data,
            created,
            expired: None,
        }
    }

    /// Copy of this version closed at `timestamp`.
    pub fn expire_at(&self, timestamp: Timestamp) -> Component {
        Component {
            expired: Some(timestamp),
            ..self.clone()
        }
    }

    /// `true` if any element of this version belongs to entity `id`.
    pub fn holds(&self, id: &NanoId) -> bool {
        self.elements.iter().any(|e| e.locator().id == *id)
    }

    /// Persistent form: element handles are lazy.
    pub fn detached(&self) -> Component {
        Component {
            elements: self.elements.iter().map(Reference::unload).collect(),
            ..self.clone()
        }
    }
}

impl Locatable for Component {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn kind(&self) -> Kind {
        Kind::Component
    }
}

impl Versioned for Component {
    fn created(&self) -> Timestamp {
        self.created
    }

    fn expired(&self) -> Option<Timestamp> {
        self.expired
    }
}
