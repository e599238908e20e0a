//! Core error types for tempora-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! lookup, component-legality, and consistency failures of the live graph.

use thiserror::Error;

use crate::id::Locator;
use crate::reference::Kind;

/// Core errors produced by the tempora-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No matching version (or no active version) exists for an id or locator.
    #[error("{kind} not found: {target}")]
    NotFound { kind: Kind, target: String },

    /// A component's element set is not a legal component.
    #[error("component validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// An edge could not be placed in the graph.
    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },

    /// A versioning invariant was broken by the graph itself.
    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

impl CoreError {
    pub(crate) fn not_found(kind: Kind, target: impl ToString) -> Self {
        CoreError::NotFound {
            kind,
            target: target.to_string(),
        }
    }
}

/// The rule a rejected component element set broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("component must contain at least one element")]
    Empty,

    #[error("component must contain at least one node")]
    NoNode,

    #[error("all elements in a component must be connected")]
    Disconnected,

    #[error("components cannot contain cycles")]
    Cyclic,

    /// An edge's stored endpoint is not one of the component's nodes.
    #[error("edge {edge} connects a node outside the component")]
    EdgeOutsideComponent { edge: Locator },
}
