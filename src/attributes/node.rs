//! Stock node attribute variants.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::document::{self, non_finite, Document, FieldError};
use super::{AttributeValue, NodeAttributes};
use crate::Result;

/// Position-only payload. The default for plain nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicNodeAttributes {
    #[serde(with = "non_finite::array")]
    pub position: [f64; 3],
}

impl BasicNodeAttributes {
    pub const TYPE_TAG: &'static str = "NodeAttributes";

    pub fn at(position: [f64; 3]) -> Self {
        Self { position }
    }

    pub fn boxed(self) -> Box<dyn NodeAttributes> {
        Box::new(self)
    }
}

impl fmt::Display for BasicNodeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_position(f, &self.position)
    }
}

impl AttributeValue for BasicNodeAttributes {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn to_document(&self) -> Result<Document> {
        document::render(Self::TYPE_TAG, self)
    }

    fn fill_from_document(&mut self, document: &Document) -> std::result::Result<(), FieldError> {
        *self = document::parse(document)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NodeAttributes for BasicNodeAttributes {
    fn clone_box(&self) -> Box<dyn NodeAttributes> {
        Box::new(*self)
    }

    fn position(&self) -> Option<[f64; 3]> {
        Some(self.position)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(with = "non_finite::array")]
    pub min: [f64; 3],
    #[serde(with = "non_finite::array")]
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

/// Payload for labelled things: objects, rooms, buildings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SemanticNodeAttributes {
    #[serde(with = "non_finite::array")]
    pub position: [f64; 3],
    pub name: String,
    pub color: [u8; 3],
    pub bounding_box: BoundingBox,
    pub semantic_label: u8,
}

impl SemanticNodeAttributes {
    pub const TYPE_TAG: &'static str = "SemanticNodeAttributes";

    pub fn new(name: impl Into<String>, position: [f64; 3]) -> Self {
        Self { position, name: name.into(), ..Self::default() }
    }

    pub fn with_label(mut self, semantic_label: u8) -> Self {
        self.semantic_label = semantic_label;
        self
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }
}

impl fmt::Display for SemanticNodeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" (label {}) ", self.name, self.semantic_label)?;
        write_position(f, &self.position)?;
        let [r, g, b] = self.color;
        write!(f, " color #{r:02x}{g:02x}{b:02x}")
    }
}

impl AttributeValue for SemanticNodeAttributes {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn to_document(&self) -> Result<Document> {
        document::render(Self::TYPE_TAG, self)
    }

    fn fill_from_document(&mut self, document: &Document) -> std::result::Result<(), FieldError> {
        *self = document::parse(document)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NodeAttributes for SemanticNodeAttributes {
    fn clone_box(&self) -> Box<dyn NodeAttributes> {
        Box::new(self.clone())
    }

    fn position(&self) -> Option<[f64; 3]> {
        Some(self.position)
    }
}

/// Payload for free-space places.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceNodeAttributes {
    #[serde(with = "non_finite::array")]
    pub position: [f64; 3],
    /// Distance to the nearest obstacle. Stored as given, sign and
    /// non-finite values included.
    #[serde(with = "non_finite")]
    pub distance: f64,
    pub num_basis_points: u32,
}

impl PlaceNodeAttributes {
    pub const TYPE_TAG: &'static str = "PlaceNodeAttributes";

    pub fn new(position: [f64; 3], distance: f64, num_basis_points: u32) -> Self {
        Self { position, distance, num_basis_points }
    }
}

impl fmt::Display for PlaceNodeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_position(f, &self.position)?;
        write!(f, " distance {} basis points {}", self.distance, self.num_basis_points)
    }
}

impl AttributeValue for PlaceNodeAttributes {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn to_document(&self) -> Result<Document> {
        document::render(Self::TYPE_TAG, self)
    }

    fn fill_from_document(&mut self, document: &Document) -> std::result::Result<(), FieldError> {
        *self = document::parse(document)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NodeAttributes for PlaceNodeAttributes {
    fn clone_box(&self) -> Box<dyn NodeAttributes> {
        Box::new(*self)
    }

    fn position(&self) -> Option<[f64; 3]> {
        Some(self.position)
    }
}

fn write_position(f: &mut fmt::Formatter<'_>, position: &[f64; 3]) -> fmt::Result {
    write!(f, "position [{}, {}, {}]", position[0], position[1], position[2])
}
