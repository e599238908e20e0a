//! Two-state handles between entities.
//!
//! A [`Reference`] is either the materialized value ([`Reference::Loaded`]) or
//! just its locator ([`Reference::Unloaded`]). Equality and hashing look only
//! at the referent's locator, so both states of the same entity version are
//! interchangeable as map keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::id::Locator;
use crate::version::Locatable;

/// Entity family a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Node,
    Edge,
    Component,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Node => write!(f, "node"),
            Kind::Edge => write!(f, "edge"),
            Kind::Component => write!(f, "component"),
        }
    }
}

/// Handle to a specific entity version, materialized or lazy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reference<T> {
    Loaded(T),
    Unloaded { locator: Locator, kind: Kind },
}

impl<T: Locatable> Reference<T> {
    /// Locator of the referent, whichever state this handle is in.
    pub fn locator(&self) -> &Locator {
        match self {
            Reference::Loaded(value) => value.locator(),
            Reference::Unloaded { locator, .. } => locator,
        }
    }

    /// Entity family of the referent.
    pub fn kind(&self) -> Kind {
        match self {
            Reference::Loaded(value) => value.kind(),
            Reference::Unloaded { kind, .. } => *kind,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Reference::Loaded(_))
    }

    /// The materialized value, if any.
    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Reference::Loaded(value) => Some(value),
            Reference::Unloaded { .. } => None,
        }
    }

    /// Returns the lazy form of this handle. Never mutates `self`.
    pub fn unload(&self) -> Reference<T> {
        Reference::Unloaded {
            locator: self.locator().clone(),
            kind: self.kind(),
        }
    }

    /// Resolves an unloaded handle through `loader`.
    ///
    /// This is the only way to widen `Unloaded` into `Loaded`. A loaded handle
    /// is returned as-is; if `loader` cannot resolve the locator the handle
    /// stays unloaded.
    pub fn load<F>(&self, loader: F) -> Reference<T>
    where
        T: Clone,
        F: FnOnce(&Locator) -> Option<T>,
    {
        match self {
            Reference::Loaded(_) => self.clone(),
            Reference::Unloaded { locator, .. } => match loader(locator) {
                Some(value) => Reference::Loaded(value),
                None => self.clone(),
            },
        }
    }
}

impl<T: Into<Element>> Reference<T> {
    /// Widens a node or edge handle into an element handle, keeping its
    /// locator and kind.
    pub fn into_element(self) -> Reference<Element> {
        match self {
            Reference::Loaded(value) => Reference::Loaded(value.into()),
            Reference::Unloaded { locator, kind } => Reference::Unloaded { locator, kind },
        }
    }
}

impl<T: Locatable> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.locator() == other.locator()
    }
}

impl<T: Locatable> Eq for Reference<T> {}

impl<T: Locatable> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator().hash(state);
    }
}
