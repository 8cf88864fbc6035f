//! Decoded features flowing from the store to the encoder.

use geo::Geometry;
use serde::Serialize;

/// An attribute value read from a store row.
///
/// `Null` is kept so decoding is lossless; the encoder drops it because MVT
/// has no null value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<Option<AttributeValue>> for AttributeValue {
    fn from(value: Option<AttributeValue>) -> Self {
        value.unwrap_or(AttributeValue::Null)
    }
}

/// A geometry with its ordered attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Vec<(String, AttributeValue)>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: Vec::new(),
        }
    }

    /// Append an attribute, keeping column order.
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    pub fn property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}
