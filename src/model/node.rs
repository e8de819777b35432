//! Node in the scene graph.

use std::fmt;
use std::time::Duration;

use super::{LayerId, NodeId};
use crate::attributes::NodeAttributes;

/// A node: identity, owning layer, payload, and (for dynamic layers) the
/// time it was observed.
#[derive(Debug, Clone)]
pub struct SceneGraphNode {
    pub id: NodeId,
    pub layer: LayerId,
    pub attributes: Box<dyn NodeAttributes>,
    /// Set for dynamic-layer nodes, `None` for static ones.
    pub timestamp: Option<Duration>,
}

impl SceneGraphNode {
    pub fn new(id: NodeId, layer: LayerId, attributes: Box<dyn NodeAttributes>) -> Self {
        Self { id, layer, attributes, timestamp: None }
    }

    pub fn dynamic(
        id: NodeId,
        layer: LayerId,
        timestamp: Duration,
        attributes: Box<dyn NodeAttributes>,
    ) -> Self {
        Self { id, layer, attributes, timestamp: Some(timestamp) }
    }

    pub fn is_dynamic(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Typed view of the payload.
    pub fn attributes_as<A: NodeAttributes>(&self) -> Option<&A> {
        self.attributes.downcast_ref::<A>()
    }

    /// Swap in a new payload, returning the previous one.
    pub fn replace_attributes(&mut self, attributes: Box<dyn NodeAttributes>) -> Box<dyn NodeAttributes> {
        std::mem::replace(&mut self.attributes, attributes)
    }
}

impl fmt::Display for SceneGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} @ layer {}", self.id, self.layer)?;
        if let Some(timestamp) = self.timestamp {
            write!(f, " t={}ns", timestamp.as_nanos())?;
        }
        write!(f, ": {}", self.attributes)
    }
}
