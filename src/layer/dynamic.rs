//! Time-ordered layer for one node category.
//!
//! Nodes arrive with strictly increasing timestamps and get consecutive
//! ids `c(0)`, `c(1)`, ... where `c` is the layer's category. Ids are never
//! reused, even after a node is removed.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::SceneGraphLayer;
use crate::attributes::{BasicEdgeAttributes, EdgeAttributes, NodeAttributes};
use crate::model::*;
use crate::{Error, Result};

/// A [`SceneGraphLayer`] whose nodes are appended in timestamp order.
#[derive(Debug, Clone)]
pub struct DynamicSceneGraphLayer {
    layer: SceneGraphLayer,
    prefix: char,
    next_index: u64,
    /// Timestamp of the most recently inserted node, removed or not.
    last_timestamp: Option<Duration>,
    /// Live nodes in temporal order.
    times: BTreeMap<Duration, NodeId>,
}

impl DynamicSceneGraphLayer {
    pub fn new(id: LayerId, prefix: char) -> Self {
        Self {
            layer: SceneGraphLayer::new(id),
            prefix,
            next_index: 0,
            last_timestamp: None,
            times: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.layer.id()
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn key(&self) -> LayerKey {
        LayerKey::dynamic(self.layer.id(), self.prefix)
    }

    /// The id the next [`emplace`](Self::emplace) will assign.
    pub fn next_node_id(&self) -> Result<NodeId> {
        NodeId::encode(self.prefix, self.next_index)
    }

    pub fn last_timestamp(&self) -> Option<Duration> {
        self.last_timestamp
    }

    pub(crate) fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Append a node observed at `timestamp`.
    ///
    /// With `connect_to_previous`, an unweighted edge to the most recent live
    /// node is inserted as well. This is the only place edges are created
    /// implicitly. Without it, the node is still appended and a later node
    /// may link to it.
    pub fn emplace(
        &mut self,
        timestamp: Duration,
        attributes: Box<dyn NodeAttributes>,
        connect_to_previous: bool,
    ) -> Result<NodeId> {
        let id = self.next_node_id()?;
        self.check_timestamp(timestamp)?;

        let previous = self.times.last_key_value().map(|(_, id)| *id);
        self.append(id, timestamp, attributes)?;

        if let Some(previous) = previous.filter(|_| connect_to_previous) {
            self.layer.insert_edge(previous, id, BasicEdgeAttributes::default().boxed())?;
            tracing::trace!(layer = %self.key(), %previous, node = %id, "linked to temporal predecessor");
        }
        Ok(id)
    }

    /// Re-insert a node under a recorded id. The sequence counter moves
    /// to just past `id`, which must belong to this category, come after
    /// every id issued so far, and carry a later timestamp.
    pub(crate) fn restore(
        &mut self,
        id: NodeId,
        timestamp: Duration,
        attributes: Box<dyn NodeAttributes>,
    ) -> Result<()> {
        let symbol = id.decode();
        if symbol.category() != self.prefix {
            return Err(Error::CorruptDocument(format!(
                "node {id} does not belong to dynamic layer {}",
                self.key()
            )));
        }
        if symbol.index() < self.next_index {
            return Err(Error::CorruptDocument(format!(
                "node {id} is out of sequence in dynamic layer {}",
                self.key()
            )));
        }
        self.check_timestamp(timestamp)?;
        self.append(id, timestamp, attributes)
    }

    /// Move the sequence counter and clock forward to recorded values, so
    /// ids and timestamps of removed tail nodes stay retired.
    pub(crate) fn resume(&mut self, next_index: u64, last_timestamp: Option<Duration>) -> Result<()> {
        if next_index < self.next_index || last_timestamp < self.last_timestamp {
            return Err(Error::CorruptDocument(format!(
                "recorded state of dynamic layer {} is behind its nodes",
                self.key()
            )));
        }
        self.next_index = next_index;
        self.last_timestamp = last_timestamp;
        Ok(())
    }

    /// Check that every node of `other` can be appended after this layer's
    /// newest node, keeping both its id and its timestamp.
    pub(crate) fn check_append(&self, other: &DynamicSceneGraphLayer) -> Result<()> {
        let Some(first) = other.nodes_in_order().next() else {
            return Ok(());
        };
        if first.id.index() < self.next_index {
            return Err(Error::DuplicateNode(first.id));
        }
        match first.timestamp {
            Some(timestamp) => self.check_timestamp(timestamp),
            None => Ok(()),
        }
    }

    /// Append `other` wholesale. Callers run [`check_append`](Self::check_append) first.
    pub(crate) fn append_layer(&mut self, other: DynamicSceneGraphLayer) -> Result<()> {
        let DynamicSceneGraphLayer { layer, next_index, last_timestamp, .. } = other;
        let SceneGraphLayer { nodes, edges, .. } = layer;

        let mut nodes: Vec<_> = nodes.into_values().collect();
        nodes.sort_by_key(|node| node.timestamp);
        for node in nodes {
            let timestamp = node.timestamp.unwrap_or_default();
            self.restore(node.id, timestamp, node.attributes)?;
        }
        for edge in edges.into_values() {
            self.layer.insert_edge_unchecked(edge);
        }
        self.next_index = self.next_index.max(next_index);
        self.last_timestamp = self.last_timestamp.max(last_timestamp);
        Ok(())
    }

    fn check_timestamp(&self, timestamp: Duration) -> Result<()> {
        match self.last_timestamp {
            Some(last) if timestamp <= last => Err(Error::OutOfOrderTimestamp {
                layer: self.key(),
                last,
                given: timestamp,
            }),
            _ => Ok(()),
        }
    }

    fn append(&mut self, id: NodeId, timestamp: Duration, attributes: Box<dyn NodeAttributes>) -> Result<()> {
        let node = SceneGraphNode::dynamic(id, self.layer.id(), timestamp, attributes);
        self.layer.insert_node(node)?;
        self.times.insert(timestamp, id);
        self.last_timestamp = Some(timestamp);
        self.next_index = id.index() + 1;
        Ok(())
    }

    pub fn insert_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        info: Box<dyn EdgeAttributes>,
    ) -> Result<()> {
        self.layer.insert_edge(source, target, info)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<usize> {
        self.take_node(id).map(|(_, removed)| removed)
    }

    pub(crate) fn take_node(&mut self, id: NodeId) -> Result<(SceneGraphNode, usize)> {
        let (node, removed) = self.layer.take_node(id)?;
        if let Some(timestamp) = node.timestamp {
            self.times.remove(&timestamp);
        }
        Ok((node, removed))
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<SceneGraphEdge> {
        self.layer.remove_edge(a, b)
    }

    /// Read-only view as a plain layer.
    pub fn as_layer(&self) -> &SceneGraphLayer {
        &self.layer
    }

    pub(crate) fn as_layer_mut(&mut self) -> &mut SceneGraphLayer {
        &mut self.layer
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.layer.has_node(id)
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.layer.has_edge(a, b)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneGraphNode> {
        self.layer.get_node(id)
    }

    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.layer.neighbors(id)
    }

    pub fn num_nodes(&self) -> usize {
        self.layer.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.layer.num_edges()
    }

    pub fn is_empty(&self) -> bool {
        self.layer.is_empty()
    }

    /// Live nodes, oldest first.
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &SceneGraphNode> {
        self.times.values().filter_map(|id| self.layer.get_node(*id))
    }

    /// Most recent live node at or before `timestamp`.
    pub fn node_at(&self, timestamp: Duration) -> Option<NodeId> {
        self.times.range(..=timestamp).next_back().map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::BasicNodeAttributes;

    fn ns(n: u64) -> Duration {
        Duration::from_nanos(n)
    }

    fn attrs() -> Box<dyn NodeAttributes> {
        BasicNodeAttributes::default().boxed()
    }

    fn sym(index: u64) -> NodeId {
        NodeId::encode('a', index).unwrap()
    }

    #[test]
    fn test_sequence_numbers_start_at_zero() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        assert_eq!(layer.emplace(ns(10), attrs(), true).unwrap(), sym(0));
        assert_eq!(layer.emplace(ns(20), attrs(), true).unwrap(), sym(1));
        assert_eq!(layer.next_node_id().unwrap(), sym(2));
        assert_eq!(layer.get_node(sym(1)).unwrap().timestamp, Some(ns(20)));
    }

    #[test]
    fn test_auto_link_to_predecessor_only() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        for t in [10, 20, 30] {
            layer.emplace(ns(t), attrs(), true).unwrap();
        }
        assert!(layer.has_edge(sym(0), sym(1)));
        assert!(layer.has_edge(sym(1), sym(2)));
        assert!(!layer.has_edge(sym(0), sym(2)));
        assert_eq!(layer.num_edges(), 2);
    }

    #[test]
    fn test_unlinked_node_still_joins_sequence() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.emplace(ns(10), attrs(), true).unwrap();
        layer.emplace(ns(20), attrs(), true).unwrap();
        layer.emplace(ns(30), attrs(), false).unwrap();
        layer.emplace(ns(40), attrs(), true).unwrap();

        assert!(!layer.has_edge(sym(1), sym(2)));
        assert!(layer.has_edge(sym(2), sym(3)));
        assert!(!layer.has_edge(sym(1), sym(3)));
    }

    #[test]
    fn test_out_of_order_leaves_state_unchanged() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.emplace(ns(10), attrs(), true).unwrap();

        for t in [10, 5] {
            let err = layer.emplace(ns(t), attrs(), true).unwrap_err();
            assert!(matches!(err, Error::OutOfOrderTimestamp { .. }));
        }
        assert_eq!(layer.num_nodes(), 1);
        assert_eq!(layer.num_edges(), 0);
        assert_eq!(layer.next_node_id().unwrap(), sym(1));
        assert_eq!(layer.last_timestamp(), Some(ns(10)));
    }

    #[test]
    fn test_removal_keeps_counter_and_clock() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.emplace(ns(10), attrs(), true).unwrap();
        layer.emplace(ns(20), attrs(), true).unwrap();
        assert_eq!(layer.remove_node(sym(1)).unwrap(), 1);

        assert!(layer.emplace(ns(15), attrs(), true).is_err());
        let id = layer.emplace(ns(30), attrs(), true).unwrap();
        assert_eq!(id, sym(2));
        assert!(layer.has_edge(sym(0), sym(2)));
    }

    #[test]
    fn test_node_at() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.emplace(ns(10), attrs(), true).unwrap();
        layer.emplace(ns(20), attrs(), true).unwrap();
        assert_eq!(layer.node_at(ns(5)), None);
        assert_eq!(layer.node_at(ns(15)), Some(sym(0)));
        assert_eq!(layer.node_at(ns(20)), Some(sym(1)));
        let order: Vec<_> = layer.nodes_in_order().map(|n| n.id).collect();
        assert_eq!(order, vec![sym(0), sym(1)]);
    }

    #[test]
    fn test_restore_skips_gaps() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.restore(sym(0), ns(10), attrs()).unwrap();
        layer.restore(sym(3), ns(40), attrs()).unwrap();
        assert_eq!(layer.next_node_id().unwrap(), sym(4));
        assert_eq!(layer.num_edges(), 0);

        assert!(matches!(layer.restore(sym(2), ns(50), attrs()).unwrap_err(), Error::CorruptDocument(_)));
        let foreign = NodeId::encode('b', 9).unwrap();
        assert!(matches!(layer.restore(foreign, ns(50), attrs()).unwrap_err(), Error::CorruptDocument(_)));
    }

    #[test]
    fn test_restore_rejects_existing_node() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.restore(sym(0), ns(10), attrs()).unwrap();
        // Force the counter back so only the node map can catch the collision.
        layer.next_index = 0;
        let err = layer.restore(sym(0), ns(20), attrs()).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(id) if id == sym(0)));
        assert_eq!(layer.num_nodes(), 1);
        assert_eq!(layer.last_timestamp(), Some(ns(10)));
        assert_eq!(layer.node_at(ns(20)), Some(sym(0)));
    }

    #[test]
    fn test_resume_retires_removed_tail() {
        let mut layer = DynamicSceneGraphLayer::new(LayerId(2), 'a');
        layer.restore(sym(0), ns(10), attrs()).unwrap();
        layer.resume(3, Some(ns(30))).unwrap();
        assert_eq!(layer.next_node_id().unwrap(), sym(3));
        assert!(layer.emplace(ns(30), attrs(), true).is_err());
        assert_eq!(layer.emplace(ns(31), attrs(), true).unwrap(), sym(3));

        assert!(matches!(layer.resume(2, Some(ns(40))).unwrap_err(), Error::CorruptDocument(_)));
        assert!(matches!(layer.resume(9, Some(ns(5))).unwrap_err(), Error::CorruptDocument(_)));
        assert!(matches!(layer.resume(9, None).unwrap_err(), Error::CorruptDocument(_)));
    }
}
