//! Edge in the scene graph.

use std::fmt;

use super::NodeId;
use crate::attributes::EdgeAttributes;

/// Lookup key for an undirected edge: the endpoints in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub k1: NodeId,
    pub k2: NodeId,
}

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b { Self { k1: a, k2: b } } else { Self { k1: b, k2: a } }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.k1 == id || self.k2 == id
    }

    /// The endpoint that is not `id`.
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if id == self.k1 { Some(self.k2) }
        else if id == self.k2 { Some(self.k1) }
        else { None }
    }
}

/// An edge. Endpoints are stored as given; lookups ignore their order.
#[derive(Debug, Clone)]
pub struct SceneGraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub info: Box<dyn EdgeAttributes>,
}

impl SceneGraphEdge {
    pub fn new(source: NodeId, target: NodeId, info: Box<dyn EdgeAttributes>) -> Self {
        Self { source, target, info }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }

    pub fn info_as<A: EdgeAttributes>(&self) -> Option<&A> {
        self.info.downcast_ref::<A>()
    }

    pub fn replace_info(&mut self, info: Box<dyn EdgeAttributes>) -> Box<dyn EdgeAttributes> {
        std::mem::replace(&mut self.info, info)
    }
}

impl fmt::Display for SceneGraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge {} -> {}: {}", self.source, self.target, self.info)
    }
}
