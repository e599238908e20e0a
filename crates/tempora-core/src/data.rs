//! Opaque payloads and type tags carried by graph entities.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Typed, opaque payload attached to a node, edge, or component.
///
/// The value is kept as JSON so that any serializable type round-trips
/// through every store backend unchanged. `type_name` records what the
/// payload was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub type_name: String,
    pub value: serde_json::Value,
}

impl Data {
    pub fn new(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Data {
            type_name: type_name.into(),
            value,
        }
    }

    /// An empty payload.
    pub fn empty() -> Self {
        Data::new("unit", serde_json::Value::Null)
    }

    /// Encodes `value` as a payload tagged with its Rust type name.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Data::new(
            std::any::type_name::<T>(),
            serde_json::to_value(value)?,
        ))
    }

    /// Decodes the payload back into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.value)
    }
}

impl Default for Data {
    fn default() -> Self {
        Data::empty()
    }
}

/// Coded type tag of a node or edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementType(String);

impl ElementType {
    pub const NODE: &'static str = "node";
    pub const EDGE: &'static str = "edge";

    pub fn new(code: impl Into<String>) -> Self {
        ElementType(code.into())
    }

    /// Default tag of nodes.
    pub fn node() -> Self {
        ElementType::new(Self::NODE)
    }

    /// Default tag of edges.
    pub fn edge() -> Self {
        ElementType::new(Self::EDGE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
