//! # Attribute payloads
//!
//! Every node and edge owns exactly one attribute value. The set of concrete
//! value types is open: the crate ships a few stock variants, integrators add
//! their own by implementing [`NodeAttributes`] or [`EdgeAttributes`] and
//! registering a constructor with an [`AttributeFactory`].
//!
//! The graph never names a concrete variant. It only talks to the capability
//! set below:
//!
//! | Capability | Method |
//! |------------|--------|
//! | default state | `Default` (used by factory constructors) |
//! | human-readable dump | `Display` |
//! | independent copy | `clone_box` |
//! | render to document | `to_document` |
//! | fill from document | `fill_from_document` |
//! | discriminant | `type_tag` |

pub mod document;
pub mod edge;
pub mod factory;
pub mod node;

use std::any::Any;
use std::fmt;

pub use document::{Document, FieldError, TYPE_KEY};
pub use edge::BasicEdgeAttributes;
pub use factory::{AttributeFactory, AttributeRegistry, EdgeAttributeFactory, NodeAttributeFactory};
pub use node::{BasicNodeAttributes, PlaceNodeAttributes, SemanticNodeAttributes};

use crate::Result;

/// Capabilities shared by both attribute families.
pub trait AttributeValue: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Stable discriminant written under [`TYPE_KEY`] in rendered documents.
    fn type_tag(&self) -> &'static str;

    /// Render this value, including its type tag.
    fn to_document(&self) -> Result<Document>;

    /// Overwrite this value's fields from a rendered document.
    fn fill_from_document(&mut self, document: &Document) -> std::result::Result<(), FieldError>;

    fn as_any(&self) -> &dyn Any;
}

/// Payload carried by a node.
pub trait NodeAttributes: AttributeValue {
    fn clone_box(&self) -> Box<dyn NodeAttributes>;

    /// World-frame position, for variants that have one.
    fn position(&self) -> Option<[f64; 3]> {
        None
    }
}

/// Payload carried by an edge.
pub trait EdgeAttributes: AttributeValue {
    fn clone_box(&self) -> Box<dyn EdgeAttributes>;

    /// Edge weight, for weighted variants.
    fn weight(&self) -> Option<f64> {
        None
    }
}

impl Clone for Box<dyn NodeAttributes> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Clone for Box<dyn EdgeAttributes> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl dyn NodeAttributes {
    pub fn downcast_ref<A: NodeAttributes>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }

    pub fn is<A: NodeAttributes>(&self) -> bool {
        self.as_any().is::<A>()
    }
}

impl dyn EdgeAttributes {
    pub fn downcast_ref<A: EdgeAttributes>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }

    pub fn is<A: EdgeAttributes>(&self) -> bool {
        self.as_any().is::<A>()
    }
}
