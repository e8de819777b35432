//! Stock edge attribute variant.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::document::{self, non_finite, Document, FieldError};
use super::{AttributeValue, EdgeAttributes};
use crate::Result;

/// Optional scalar weight. The default for every edge, including the ones a
/// dynamic layer inserts on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicEdgeAttributes {
    pub weighted: bool,
    #[serde(with = "non_finite")]
    pub weight: f64,
}

impl Default for BasicEdgeAttributes {
    fn default() -> Self {
        Self { weighted: false, weight: 1.0 }
    }
}

impl BasicEdgeAttributes {
    pub const TYPE_TAG: &'static str = "EdgeAttributes";

    pub fn weighted(weight: f64) -> Self {
        Self { weighted: true, weight }
    }

    pub fn boxed(self) -> Box<dyn EdgeAttributes> {
        Box::new(self)
    }
}

impl fmt::Display for BasicEdgeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weighted {
            write!(f, "weight {}", self.weight)
        } else {
            write!(f, "unweighted")
        }
    }
}

impl AttributeValue for BasicEdgeAttributes {
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

impl EdgeAttributes for BasicEdgeAttributes {
    fn clone_box(&self) -> Box<dyn EdgeAttributes> {
        Box::new(*self)
    }

    fn weight(&self) -> Option<f64> {
        self.weighted.then_some(self.weight)
    }
}
