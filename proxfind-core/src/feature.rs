//! Feature and layer model.
//!
//! Features carry an identifier, a geometry, and an ordered attribute map.
//! Attributes are a tagged value type rather than raw JSON so that match
//! results can be snapshotted, persisted, and exported without re-reading
//! dynamic records.

use geo_types::Geometry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute fields checked, in order, when extracting a display name.
const NAME_FIELDS: [&str; 5] = ["name", "Name", "NAME", "title", "label"];

/// A single attribute value.
///
/// Untagged so that attribute maps serialize as plain JSON objects.
/// Variant order matters for deserialization: integers are tried before
/// floats so whole numbers round-trip as `Integer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// The text content, if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttributeValue::Integer(i)
                } else {
                    AttributeValue::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => AttributeValue::Text(s),
            // Arrays and objects are flattened to their JSON text form.
            other => AttributeValue::Text(other.to_string()),
        }
    }
}

/// Ordered attribute map of a feature (field name, insertion order preserved).
pub type Attributes = IndexMap<String, AttributeValue>;

/// A single feature: identifier, geometry, attributes. Immutable input for
/// the duration of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier, unique within the owning layer.
    pub id: u64,
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    /// Create a feature with no attributes.
    pub fn new(id: u64, geometry: Geometry<f64>) -> Self {
        Feature {
            id,
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Create a feature with attributes.
    pub fn with_attributes(id: u64, geometry: Geometry<f64>, attributes: Attributes) -> Self {
        Feature {
            id,
            geometry,
            attributes,
        }
    }

    /// Best-effort display name, extracted from well-known attribute fields
    /// (`name`, `Name`, `NAME`, `title`, `label`) when available.
    pub fn display_name(&self) -> Option<&str> {
        NAME_FIELDS
            .iter()
            .filter_map(|field| self.attributes.get(*field))
            .filter_map(|value| value.as_str())
            .find(|s| !s.is_empty())
    }
}

/// A named collection of features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub features: Vec<Feature>,
}

impl Layer {
    /// Create an empty layer.
    pub fn new(name: impl Into<String>) -> Self {
        Layer {
            name: name.into(),
            features: Vec::new(),
        }
    }

    /// Create a layer from existing features.
    pub fn with_features(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Layer {
            name: name.into(),
            features,
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Look up a feature by id.
    pub fn get(&self, id: u64) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
