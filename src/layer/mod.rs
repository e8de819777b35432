//! # Graph layers
//!
//! A layer holds the nodes of one abstraction level and the edges among
//! them. Edges are undirected for lookup: `(a, b)` and `(b, a)` address the
//! same edge.
//!
//! | Layer | Module | Node ids |
//! |-------|--------|----------|
//! | `SceneGraphLayer` | `layer` | chosen by the caller |
//! | `DynamicSceneGraphLayer` | `layer::dynamic` | assigned in timestamp order |
//!
//! Layers owned by a [`SceneGraph`](crate::SceneGraph) are only reachable
//! through shared references, so every mutation goes through the graph and
//! its node index stays consistent.

pub mod dynamic;

use std::collections::{BTreeMap, BTreeSet};

use smallvec::SmallVec;

use crate::attributes::EdgeAttributes;
use crate::model::*;
use crate::{Error, Result};

pub use dynamic::DynamicSceneGraphLayer;

/// Edges touching one node, collected before they are removed.
pub type IncidentEdges = SmallVec<[EdgeKey; 8]>;

// ============================================================================
// SceneGraphLayer
// ============================================================================

/// Nodes and intra-layer edges of one abstraction level.
#[derive(Debug, Clone)]
pub struct SceneGraphLayer {
    id: LayerId,
    nodes: BTreeMap<NodeId, SceneGraphNode>,
    edges: BTreeMap<EdgeKey, SceneGraphEdge>,
    /// node id → ids of nodes it shares an edge with
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl SceneGraphLayer {
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn insert_node(&mut self, node: SceneGraphNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Remove a node and every edge touching it. Returns the number of
    /// edges removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize> {
        self.take_node(id).map(|(_, removed)| removed)
    }

    /// Like [`remove_node`](Self::remove_node), handing back the node.
    pub(crate) fn take_node(&mut self, id: NodeId) -> Result<(SceneGraphNode, usize)> {
        let node = self.nodes.remove(&id).ok_or(Error::NodeNotFound(id))?;

        let incident: IncidentEdges = self
            .adjacency
            .remove(&id)
            .unwrap_or_default()
            .into_iter()
            .map(|other| EdgeKey::new(id, other))
            .collect();

        for key in &incident {
            self.edges.remove(key);
            if let Some(other) = key.other(id) {
                self.unlink(other, id);
            }
        }

        Ok((node, incident.len()))
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneGraphNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneGraphNode> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneGraphNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Insert an undirected edge between two nodes of this layer.
    pub fn insert_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        info: Box<dyn EdgeAttributes>,
    ) -> Result<()> {
        self.check_edge(source, target)?;
        self.insert_edge_unchecked(SceneGraphEdge::new(source, target, info));
        Ok(())
    }

    /// Validate an edge insertion without performing it.
    pub fn check_edge(&self, source: NodeId, target: NodeId) -> Result<()> {
        if source == target {
            return Err(Error::InvalidEdge(source));
        }
        for id in [source, target] {
            if !self.nodes.contains_key(&id) {
                return Err(Error::NodeNotFound(id));
            }
        }
        if self.edges.contains_key(&EdgeKey::new(source, target)) {
            return Err(Error::DuplicateEdge(source, target));
        }
        Ok(())
    }

    fn insert_edge_unchecked(&mut self, edge: SceneGraphEdge) {
        self.adjacency.entry(edge.source).or_default().insert(edge.target);
        self.adjacency.entry(edge.target).or_default().insert(edge.source);
        self.edges.insert(edge.key(), edge);
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<SceneGraphEdge> {
        let edge = self
            .edges
            .remove(&EdgeKey::new(a, b))
            .ok_or(Error::EdgeNotFound(a, b))?;
        self.unlink(a, b);
        self.unlink(b, a);
        Ok(edge)
    }

    fn unlink(&mut self, from: NodeId, to: NodeId) {
        if let Some(neighbors) = self.adjacency.get_mut(&from) {
            neighbors.remove(&to);
            if neighbors.is_empty() {
                self.adjacency.remove(&from);
            }
        }
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.edges.contains_key(&EdgeKey::new(a, b))
    }

    pub fn get_edge(&self, a: NodeId, b: NodeId) -> Option<&SceneGraphEdge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    pub(crate) fn get_edge_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut SceneGraphEdge> {
        self.edges.get_mut(&EdgeKey::new(a, b))
    }

    pub fn edges(&self) -> impl Iterator<Item = &SceneGraphEdge> {
        self.edges.values()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Nodes sharing an edge with `id`; empty when there are none.
    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.adjacency.get(&id).cloned().unwrap_or_default()
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Fold `other` into this layer.
    ///
    /// All-or-nothing: every node and edge of `other` is checked first, and
    /// the first conflict is returned without touching this layer.
    pub fn merge(&mut self, other: SceneGraphLayer) -> Result<()> {
        self.check_merge(&other)?;
        self.merge_unchecked(other);
        Ok(())
    }

    pub(crate) fn check_merge(&self, other: &SceneGraphLayer) -> Result<()> {
        if let Some(id) = other.nodes.keys().find(|id| self.nodes.contains_key(id)) {
            return Err(Error::DuplicateNode(*id));
        }
        if let Some(edge) = other.edges.values().find(|e| self.edges.contains_key(&e.key())) {
            return Err(Error::DuplicateEdge(edge.source, edge.target));
        }
        Ok(())
    }

    pub(crate) fn merge_unchecked(&mut self, other: SceneGraphLayer) {
        let SceneGraphLayer { nodes, edges, .. } = other;
        for (id, mut node) in nodes {
            node.layer = self.id;
            self.nodes.insert(id, node);
        }
        for edge in edges.into_values() {
            self.insert_edge_unchecked(edge);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
