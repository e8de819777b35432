//! # Scene Graph
//!
//! The orchestrator. Owns the static layers, the dynamic layers (one per
//! layer id and category), a global node index, the inter-layer edges and
//! an optional mesh.
//!
//! ```text
//!   emplace_node / insert_edge / remove_node
//!              │
//!              ▼
//!   SceneGraph ──node_lookup──► LayerKey ──► SceneGraphLayer
//!              │                        └──► DynamicSceneGraphLayer
//!              └──► interlayer_edges (endpoints in different containers)
//! ```
//!
//! Every mutation validates first and commits second: a call that returns
//! an error leaves the graph exactly as it was.
//!
//! `SceneGraph` has no internal locking. `&mut self` mutations and `&self`
//! queries carry the single-writer contract; wrap the graph in a
//! [`SharedSceneGraph`](crate::SharedSceneGraph) for concurrent readers.

pub mod mesh;
pub mod serialization;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use hashbrown::HashMap;

use crate::attributes::{BasicEdgeAttributes, EdgeAttributes, NodeAttributes};
use crate::config::SceneGraphConfig;
use crate::layer::{DynamicSceneGraphLayer, SceneGraphLayer};
use crate::model::*;
use crate::{Error, Result};

pub use mesh::MeshBlob;

// ============================================================================
// SceneGraph
// ============================================================================

/// Layered scene graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    config: SceneGraphConfig,
    layers: BTreeMap<LayerId, SceneGraphLayer>,
    dynamic_layers: BTreeMap<LayerId, BTreeMap<char, DynamicSceneGraphLayer>>,
    /// node id → container that owns it
    node_lookup: HashMap<NodeId, LayerKey>,
    interlayer_edges: BTreeMap<EdgeKey, SceneGraphEdge>,
    interlayer_adjacency: HashMap<NodeId, BTreeSet<NodeId>>,
    mesh: Option<MeshBlob>,
}

impl SceneGraph {
    /// Empty graph accepting nodes on `layer_ids`.
    pub fn new(layer_ids: impl IntoIterator<Item = impl Into<LayerId>>) -> Self {
        Self::with_config(SceneGraphConfig::new(layer_ids))
    }

    pub fn with_config(mut config: SceneGraphConfig) -> Self {
        config.layer_ids.sort_unstable();
        config.layer_ids.dedup();
        let layers = config
            .layer_ids
            .iter()
            .map(|id| (*id, SceneGraphLayer::new(*id)))
            .collect();
        Self {
            config,
            layers,
            dynamic_layers: BTreeMap::new(),
            node_lookup: HashMap::new(),
            interlayer_edges: BTreeMap::new(),
            interlayer_adjacency: HashMap::new(),
            mesh: None,
        }
    }

    pub fn config(&self) -> &SceneGraphConfig {
        &self.config
    }

    /// Configured layer ids, ascending.
    pub fn layer_ids(&self) -> &[LayerId] {
        &self.config.layer_ids
    }

    /// Drop every node, edge and the mesh. Configuration is kept.
    pub fn clear(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Insert a node with a caller-chosen id into a static layer.
    pub fn emplace_node(
        &mut self,
        layer: impl Into<LayerId>,
        id: impl Into<NodeId>,
        attributes: Box<dyn NodeAttributes>,
    ) -> Result<()> {
        let (layer, id) = (layer.into(), id.into());
        let target = self.layers.get_mut(&layer).ok_or(Error::UnknownLayer(layer))?;
        if self.node_lookup.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        target.insert_node(SceneGraphNode::new(id, layer, attributes))?;
        self.node_lookup.insert(id, LayerKey::fixed(layer));
        tracing::debug!(%layer, node = %id, "emplaced node");
        Ok(())
    }

    /// Append a node to the dynamic layer for `prefix` under `layer`,
    /// creating that dynamic layer on first use. Returns the assigned id.
    ///
    /// With `connect_to_previous`, the node is also linked to the newest
    /// node already in that dynamic layer.
    pub fn emplace_dynamic_node(
        &mut self,
        layer: impl Into<LayerId>,
        prefix: char,
        timestamp: Duration,
        attributes: Box<dyn NodeAttributes>,
        connect_to_previous: bool,
    ) -> Result<NodeId> {
        let layer = layer.into();
        if !self.layers.contains_key(&layer) {
            return Err(Error::UnknownLayer(layer));
        }

        let next_id = match self.get_dynamic_layer(layer, prefix) {
            Some(dynamic) => dynamic.next_node_id()?,
            None => NodeId::encode(prefix, 0)?,
        };
        if self.node_lookup.contains_key(&next_id) {
            return Err(Error::DuplicateNode(next_id));
        }

        let dynamic = self
            .dynamic_layers
            .entry(layer)
            .or_default()
            .entry(prefix)
            .or_insert_with(|| DynamicSceneGraphLayer::new(layer, prefix));
        let id = dynamic.emplace(timestamp, attributes, connect_to_previous)?;
        self.node_lookup.insert(id, LayerKey::dynamic(layer, prefix));
        tracing::debug!(%layer, %prefix, node = %id, ?timestamp, "emplaced dynamic node");
        Ok(id)
    }

    /// Re-insert a dynamic node under its recorded id.
    pub(crate) fn restore_dynamic_node(
        &mut self,
        layer: LayerId,
        id: NodeId,
        timestamp: Duration,
        attributes: Box<dyn NodeAttributes>,
    ) -> Result<()> {
        if !self.layers.contains_key(&layer) {
            return Err(Error::UnknownLayer(layer));
        }
        if self.node_lookup.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        let prefix = id.category();
        self.dynamic_layers
            .entry(layer)
            .or_default()
            .entry(prefix)
            .or_insert_with(|| DynamicSceneGraphLayer::new(layer, prefix))
            .restore(id, timestamp, attributes)?;
        self.node_lookup.insert(id, LayerKey::dynamic(layer, prefix));
        Ok(())
    }

    /// Carry a dynamic layer's recorded counter and clock over, creating
    /// the layer if none of its nodes survived.
    pub(crate) fn resume_dynamic_layer(
        &mut self,
        layer: LayerId,
        prefix: char,
        next_index: u64,
        last_timestamp: Option<Duration>,
    ) -> Result<()> {
        if !self.layers.contains_key(&layer) {
            return Err(Error::UnknownLayer(layer));
        }
        self.dynamic_layers
            .entry(layer)
            .or_default()
            .entry(prefix)
            .or_insert_with(|| DynamicSceneGraphLayer::new(layer, prefix))
            .resume(next_index, last_timestamp)
    }

    /// Remove a node together with every intra- and inter-layer edge
    /// touching it. Returns the number of edges removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize> {
        let key = *self.node_lookup.get(&id).ok_or(Error::NodeNotFound(id))?;

        let intra = match key.prefix {
            None => self.layers.get_mut(&key.layer).map(|layer| layer.remove_node(id)),
            Some(prefix) => self
                .dynamic_layers
                .get_mut(&key.layer)
                .and_then(|group| group.get_mut(&prefix))
                .map(|layer| layer.remove_node(id)),
        }
        .unwrap_or(Err(Error::NodeNotFound(id)))?;

        let mut inter = 0;
        for other in self.interlayer_adjacency.remove(&id).unwrap_or_default() {
            self.interlayer_edges.remove(&EdgeKey::new(id, other));
            self.unlink_interlayer(other, id);
            inter += 1;
        }

        self.node_lookup.remove(&id);
        tracing::debug!(node = %id, layer = %key, edges = intra + inter, "removed node");
        Ok(intra + inter)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.node_lookup.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneGraphNode> {
        let key = self.node_lookup.get(&id)?;
        self.container(*key)?.get_node(id)
    }

    /// Container that owns `id`.
    pub fn node_layer(&self, id: NodeId) -> Option<LayerKey> {
        self.node_lookup.get(&id).copied()
    }

    /// Replace a node's payload, returning the previous one.
    pub fn set_node_attributes(
        &mut self,
        id: NodeId,
        attributes: Box<dyn NodeAttributes>,
    ) -> Result<Box<dyn NodeAttributes>> {
        let key = *self.node_lookup.get(&id).ok_or(Error::NodeNotFound(id))?;
        let node = self
            .container_mut(key)
            .and_then(|layer| layer.get_node_mut(id))
            .ok_or(Error::NodeNotFound(id))?;
        Ok(node.replace_attributes(attributes))
    }

    pub fn num_nodes(&self) -> usize {
        self.node_lookup.len()
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Insert an edge with default (unweighted) attributes.
    pub fn insert_edge(&mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Result<()> {
        self.insert_edge_with(source, target, BasicEdgeAttributes::default().boxed())
    }

    /// Insert an edge. Endpoints in the same container make an intra-layer
    /// edge, anything else is recorded as an inter-layer edge.
    pub fn insert_edge_with(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        info: Box<dyn EdgeAttributes>,
    ) -> Result<()> {
        let (source, target) = (source.into(), target.into());
        if source == target {
            return Err(Error::InvalidEdge(source));
        }
        let source_key = *self.node_lookup.get(&source).ok_or(Error::NodeNotFound(source))?;
        let target_key = *self.node_lookup.get(&target).ok_or(Error::NodeNotFound(target))?;

        if source_key == target_key {
            self.container_mut(source_key)
                .ok_or(Error::UnknownLayer(source_key.layer))?
                .insert_edge(source, target, info)?;
            tracing::debug!(layer = %source_key, %source, %target, "inserted edge");
            return Ok(());
        }

        let key = EdgeKey::new(source, target);
        if self.interlayer_edges.contains_key(&key) {
            return Err(Error::DuplicateEdge(source, target));
        }
        self.interlayer_edges.insert(key, SceneGraphEdge::new(source, target, info));
        self.interlayer_adjacency.entry(source).or_default().insert(target);
        self.interlayer_adjacency.entry(target).or_default().insert(source);
        tracing::debug!(from = %source_key, to = %target_key, %source, %target, "inserted inter-layer edge");
        Ok(())
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        let a_key = *self.node_lookup.get(&a).ok_or(Error::NodeNotFound(a))?;
        let b_key = *self.node_lookup.get(&b).ok_or(Error::NodeNotFound(b))?;

        if a_key == b_key {
            self.container_mut(a_key).ok_or(Error::EdgeNotFound(a, b))?.remove_edge(a, b)?;
        } else {
            self.interlayer_edges
                .remove(&EdgeKey::new(a, b))
                .ok_or(Error::EdgeNotFound(a, b))?;
            self.unlink_interlayer(a, b);
            self.unlink_interlayer(b, a);
        }
        tracing::debug!(%a, %b, "removed edge");
        Ok(())
    }

    fn unlink_interlayer(&mut self, from: NodeId, to: NodeId) {
        if let Some(neighbors) = self.interlayer_adjacency.get_mut(&from) {
            neighbors.remove(&to);
            if neighbors.is_empty() {
                self.interlayer_adjacency.remove(&from);
            }
        }
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.get_edge(a, b).is_some()
    }

    pub fn get_edge(&self, a: NodeId, b: NodeId) -> Option<&SceneGraphEdge> {
        if let Some(edge) = self.interlayer_edges.get(&EdgeKey::new(a, b)) {
            return Some(edge);
        }
        let key = self.node_lookup.get(&a)?;
        self.container(*key)?.get_edge(a, b)
    }

    /// Replace an edge's payload, returning the previous one.
    pub fn set_edge_attributes(
        &mut self,
        a: NodeId,
        b: NodeId,
        info: Box<dyn EdgeAttributes>,
    ) -> Result<Box<dyn EdgeAttributes>> {
        if let Some(edge) = self.interlayer_edges.get_mut(&EdgeKey::new(a, b)) {
            return Ok(edge.replace_info(info));
        }
        let key = *self.node_lookup.get(&a).ok_or(Error::NodeNotFound(a))?;
        let edge = self
            .container_mut(key)
            .and_then(|layer| layer.get_edge_mut(a, b))
            .ok_or(Error::EdgeNotFound(a, b))?;
        Ok(edge.replace_info(info))
    }

    pub fn num_edges(&self) -> usize {
        self.containers().map(SceneGraphLayer::num_edges).sum::<usize>() + self.interlayer_edges.len()
    }

    pub fn interlayer_edges(&self) -> impl Iterator<Item = &SceneGraphEdge> {
        self.interlayer_edges.values()
    }

    /// Every node sharing an edge with `id`, in any layer.
    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut neighbors = self
            .node_lookup
            .get(&id)
            .and_then(|key| self.container(*key))
            .map(|layer| layer.neighbors(id))
            .unwrap_or_default();
        neighbors.extend(self.interlayer_neighbors(id));
        neighbors
    }

    pub fn interlayer_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.interlayer_adjacency.get(&id).into_iter().flatten().copied()
    }

    /// First inter-layer neighbour on a higher layer.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let layer = self.node_lookup.get(&id)?.layer;
        self.interlayer_neighbors(id).find(|other| self.layer_of(*other) > Some(layer))
    }

    /// Inter-layer neighbours on lower layers.
    pub fn children(&self, id: NodeId) -> BTreeSet<NodeId> {
        let Some(layer) = self.layer_of(id) else {
            return BTreeSet::new();
        };
        self.interlayer_neighbors(id)
            .filter(|other| self.layer_of(*other).is_some_and(|l| l < layer))
            .collect()
    }

    fn layer_of(&self, id: NodeId) -> Option<LayerId> {
        self.node_lookup.get(&id).map(|key| key.layer)
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Whether `layer` is one of the configured layer ids.
    pub fn has_layer(&self, layer: impl Into<LayerId>) -> bool {
        self.layers.contains_key(&layer.into())
    }

    pub fn has_dynamic_layer(&self, layer: impl Into<LayerId>, prefix: char) -> bool {
        self.get_dynamic_layer(layer, prefix).is_some()
    }

    pub fn get_layer(&self, layer: impl Into<LayerId>) -> Option<&SceneGraphLayer> {
        self.layers.get(&layer.into())
    }

    pub fn get_dynamic_layer(&self, layer: impl Into<LayerId>, prefix: char) -> Option<&DynamicSceneGraphLayer> {
        self.dynamic_layers.get(&layer.into())?.get(&prefix)
    }

    pub fn dynamic_layers(&self) -> impl Iterator<Item = &DynamicSceneGraphLayer> {
        self.dynamic_layers.values().flat_map(BTreeMap::values)
    }

    /// Number of layer ids that currently hold at least one node, static or
    /// dynamic.
    pub fn num_layers(&self) -> usize {
        self.node_lookup
            .values()
            .map(|key| key.layer)
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn container(&self, key: LayerKey) -> Option<&SceneGraphLayer> {
        match key.prefix {
            None => self.layers.get(&key.layer),
            Some(prefix) => self.get_dynamic_layer(key.layer, prefix).map(DynamicSceneGraphLayer::as_layer),
        }
    }

    fn container_mut(&mut self, key: LayerKey) -> Option<&mut SceneGraphLayer> {
        match key.prefix {
            None => self.layers.get_mut(&key.layer),
            Some(prefix) => self
                .dynamic_layers
                .get_mut(&key.layer)?
                .get_mut(&prefix)
                .map(DynamicSceneGraphLayer::as_layer_mut),
        }
    }

    /// Static layers, then dynamic layers, each in ascending order.
    fn containers(&self) -> impl Iterator<Item = &SceneGraphLayer> {
        self.layers
            .values()
            .chain(self.dynamic_layers().map(DynamicSceneGraphLayer::as_layer))
    }

    // ========================================================================
    // Mesh
    // ========================================================================

    pub fn set_mesh(&mut self, mesh: MeshBlob) {
        self.mesh = Some(mesh);
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn mesh(&self) -> Option<&MeshBlob> {
        self.mesh.as_ref()
    }

    pub fn take_mesh(&mut self) -> Option<MeshBlob> {
        self.mesh.take()
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Fold `other` into this graph.
    ///
    /// All-or-nothing: fails with `UnknownLayer` if `other` has nodes on a
    /// layer this graph does not accept, `DuplicateNode` if any node id is
    /// already present, or `OutOfOrderTimestamp` if a dynamic layer of
    /// `other` does not start after the matching layer here. The mesh of
    /// `other` is taken only when this graph has none.
    pub fn merge(&mut self, other: SceneGraph) -> Result<()> {
        for (id, key) in &other.node_lookup {
            if !self.layers.contains_key(&key.layer) {
                return Err(Error::UnknownLayer(key.layer));
            }
            if self.node_lookup.contains_key(id) {
                return Err(Error::DuplicateNode(*id));
            }
        }
        for theirs in other.dynamic_layers() {
            if let Some(ours) = self.get_dynamic_layer(theirs.id(), theirs.prefix()) {
                ours.check_append(theirs)?;
            }
        }

        let SceneGraph {
            layers,
            dynamic_layers,
            node_lookup,
            interlayer_edges,
            interlayer_adjacency,
            mesh,
            ..
        } = other;

        for (id, layer) in layers {
            if let Some(ours) = self.layers.get_mut(&id) {
                ours.merge_unchecked(layer);
            }
        }
        for (id, group) in dynamic_layers {
            if !self.layers.contains_key(&id) {
                continue;
            }
            for (prefix, theirs) in group {
                match self.dynamic_layers.entry(id).or_default().entry(prefix) {
                    Entry::Occupied(mut ours) => ours.get_mut().append_layer(theirs)?,
                    Entry::Vacant(slot) => {
                        slot.insert(theirs);
                    }
                }
            }
        }
        self.node_lookup.extend(node_lookup);
        self.interlayer_edges.extend(interlayer_edges);
        for (id, neighbors) in interlayer_adjacency {
            self.interlayer_adjacency.entry(id).or_default().extend(neighbors);
        }
        if self.mesh.is_none() {
            self.mesh = mesh;
        }
        tracing::debug!(nodes = self.num_nodes(), edges = self.num_edges(), "merged scene graph");
        Ok(())
    }
}

impl Default for SceneGraph {
    /// Empty graph over [`LayerId::STANDARD`].
    fn default() -> Self {
        Self::with_config(SceneGraphConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
