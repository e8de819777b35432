//! Named-constructor registry used to resurrect attribute payloads.
//!
//! Deserialization only sees a document with a `"type"` field. The factory
//! maps that tag to a zero-argument constructor, builds a default instance
//! and lets the instance fill itself in. There is no global registry: build
//! an [`AttributeRegistry`] at setup and pass it to
//! [`SceneGraph::deserialize`](crate::SceneGraph::deserialize).
//!
//! Registering a tag twice replaces the earlier constructor.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::document::TYPE_KEY;
use super::{
    AttributeValue, BasicEdgeAttributes, BasicNodeAttributes, EdgeAttributes, NodeAttributes,
    PlaceNodeAttributes, SemanticNodeAttributes,
};
use crate::{Error, Result};

/// Zero-argument constructor for one attribute variant.
pub type Constructor<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Constructor table for one attribute family.
pub struct AttributeFactory<T: ?Sized> {
    constructors: BTreeMap<String, Option<Constructor<T>>>,
}

pub type NodeAttributeFactory = AttributeFactory<dyn NodeAttributes>;
pub type EdgeAttributeFactory = AttributeFactory<dyn EdgeAttributes>;

impl<T: ?Sized> Default for AttributeFactory<T> {
    fn default() -> Self {
        Self { constructors: BTreeMap::new() }
    }
}

impl<T: ?Sized> fmt::Debug for AttributeFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeFactory")
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized + AttributeValue> AttributeFactory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `type_tag`. Returns `true` when an
    /// earlier entry was replaced.
    pub fn register<F>(&mut self, type_tag: impl Into<String>, constructor: F) -> bool
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        let type_tag = type_tag.into();
        let replaced = self.constructors.insert(type_tag.clone(), Some(Box::new(constructor)));
        if replaced.is_some() {
            tracing::debug!(%type_tag, "replaced attribute constructor");
        }
        replaced.is_some()
    }

    /// Record a tag whose constructor is not available yet. Creating a value
    /// for it fails with [`Error::InvalidConstructor`] until a real
    /// constructor is registered.
    pub fn reserve(&mut self, type_tag: impl Into<String>) {
        self.constructors.entry(type_tag.into()).or_insert(None);
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.constructors.contains_key(type_tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Materialize the variant named by the document's type tag.
    pub fn create(&self, record: &Value) -> Result<Box<T>> {
        let Some(fields) = record.as_object() else {
            return Err(Error::MalformedRecord {
                reason: "attribute record is not an object".into(),
                record: record.clone(),
            });
        };

        let type_tag = match fields.get(TYPE_KEY) {
            Some(Value::String(tag)) => tag,
            Some(_) => {
                return Err(Error::MalformedRecord {
                    reason: format!("`{TYPE_KEY}` is not a string"),
                    record: record.clone(),
                });
            }
            None => {
                return Err(Error::MalformedRecord {
                    reason: format!("missing `{TYPE_KEY}`"),
                    record: record.clone(),
                });
            }
        };

        let constructor = match self.constructors.get(type_tag.as_str()) {
            None => return Err(Error::UnknownAttributeType(type_tag.clone())),
            Some(None) => return Err(Error::InvalidConstructor(type_tag.clone())),
            Some(Some(constructor)) => constructor,
        };

        let mut value = constructor();
        value.fill_from_document(fields).map_err(|e| Error::MalformedRecord {
            reason: format!("{e} when converting {type_tag}"),
            record: record.clone(),
        })?;
        Ok(value)
    }
}

impl AttributeFactory<dyn NodeAttributes> {
    /// Register a node variant under the tag its default instance reports.
    pub fn register_type<A: NodeAttributes + Default>(&mut self) -> bool {
        let type_tag = A::default().type_tag();
        self.register(type_tag, || Box::new(A::default()) as Box<dyn NodeAttributes>)
    }

    /// Factory with the stock node variants registered.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register_type::<BasicNodeAttributes>();
        factory.register_type::<SemanticNodeAttributes>();
        factory.register_type::<PlaceNodeAttributes>();
        factory
    }
}

impl AttributeFactory<dyn EdgeAttributes> {
    /// Register an edge variant under the tag its default instance reports.
    pub fn register_type<A: EdgeAttributes + Default>(&mut self) -> bool {
        let type_tag = A::default().type_tag();
        self.register(type_tag, || Box::new(A::default()) as Box<dyn EdgeAttributes>)
    }

    /// Factory with the stock edge variant registered.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register_type::<BasicEdgeAttributes>();
        factory
    }
}

/// One factory per attribute family.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    pub nodes: NodeAttributeFactory,
    pub edges: EdgeAttributeFactory,
}

impl AttributeRegistry {
    /// Empty registry: every tag is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock variants of both families.
    pub fn with_defaults() -> Self {
        Self {
            nodes: NodeAttributeFactory::with_defaults(),
            edges: EdgeAttributeFactory::with_defaults(),
        }
    }
}
