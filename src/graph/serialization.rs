//! JSON document form of a [`SceneGraph`].
//!
//! ```text
//! SceneGraph ──to_document()──► GraphDocument ──serde_json──► text / file
//!            ◄─from_document()─ (attributes rebuilt by AttributeRegistry)
//! ```
//!
//! Nodes are written sorted by `(layer, id)`. Edges are written layer by
//! layer, inter-layer edges last, each group sorted by [`EdgeKey`].
//! Rebuilding a graph replays the same mutations a caller would make, so
//! any document that decodes is a graph the API could have produced.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{MeshBlob, SceneGraph};
use crate::attributes::{AttributeRegistry, AttributeValue};
use crate::config::SceneGraphConfig;
use crate::layer::DynamicSceneGraphLayer;
use crate::model::*;
use crate::{Error, Result};

// ============================================================================
// Records
// ============================================================================

/// Top-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub layer_ids: Vec<LayerId>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    /// Counter and clock of every dynamic layer, including ones whose nodes
    /// were all removed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_layers: Vec<DynamicLayerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshBlob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub layer: LayerId,
    /// Nanoseconds. Present only for dynamic-layer nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub attributes: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub attributes: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicLayerRecord {
    pub layer: LayerId,
    pub prefix: char,
    /// Sequence index the next appended node will get.
    pub next_index: u64,
    /// Nanoseconds of the newest node ever appended, removed or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<u64>,
}

impl DynamicLayerRecord {
    fn from_layer(layer: &DynamicSceneGraphLayer) -> Result<Self> {
        Ok(Self {
            layer: layer.id(),
            prefix: layer.prefix(),
            next_index: layer.next_index(),
            last_timestamp: layer.last_timestamp().map(|t| nanos(t, layer.key())).transpose()?,
        })
    }
}

fn nanos(timestamp: Duration, owner: impl std::fmt::Display) -> Result<u64> {
    u64::try_from(timestamp.as_nanos())
        .map_err(|_| Error::CorruptDocument(format!("timestamp of {owner} does not fit in u64 nanoseconds")))
}

impl NodeRecord {
    fn from_node(node: &SceneGraphNode) -> Result<Self> {
        let timestamp = node.timestamp.map(|t| nanos(t, format!("node {}", node.id))).transpose()?;
        Ok(Self {
            id: node.id,
            layer: node.layer,
            timestamp,
            attributes: Value::Object(node.attributes.to_document()?),
        })
    }
}

impl EdgeRecord {
    fn from_edge(edge: &SceneGraphEdge) -> Result<Self> {
        Ok(Self {
            source: edge.source,
            target: edge.target,
            attributes: Value::Object(edge.info.to_document()?),
        })
    }
}

// ============================================================================
// SceneGraph <-> document
// ============================================================================

impl SceneGraph {
    /// Snapshot of this graph as document records.
    pub fn to_records(&self) -> Result<GraphDocument> {
        let mut nodes: Vec<&SceneGraphNode> = self.containers().flat_map(|layer| layer.nodes()).collect();
        nodes.sort_by_key(|node| (node.layer, node.id));

        let edges = self
            .containers()
            .flat_map(|layer| layer.edges())
            .chain(self.interlayer_edges())
            .map(EdgeRecord::from_edge)
            .collect::<Result<Vec<_>>>()?;

        Ok(GraphDocument {
            layer_ids: self.layer_ids().to_vec(),
            nodes: nodes.into_iter().map(NodeRecord::from_node).collect::<Result<_>>()?,
            edges,
            dynamic_layers: self.dynamic_layers().map(DynamicLayerRecord::from_layer).collect::<Result<_>>()?,
            mesh: self.mesh.clone(),
        })
    }

    pub fn to_document(&self) -> Result<Value> {
        serde_json::to_value(self.to_records()?).map_err(|e| Error::CorruptDocument(e.to_string()))
    }

    /// Compact JSON text.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(&self.to_records()?).map_err(|e| Error::CorruptDocument(e.to_string()))
    }

    /// Rebuild a graph from a document, resolving attribute payloads
    /// through `registry`. Nothing is returned unless every record decodes.
    pub fn from_document(document: Value, registry: &AttributeRegistry) -> Result<Self> {
        let result = serde_json::from_value::<GraphDocument>(document)
            .map_err(|e| Error::CorruptDocument(e.to_string()))
            .and_then(|records| Self::from_records(records, registry));
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to rebuild scene graph");
        }
        result
    }

    pub fn deserialize(text: &str, registry: &AttributeRegistry) -> Result<Self> {
        let document: Value = serde_json::from_str(text).map_err(|e| {
            tracing::warn!(error = %e, "scene graph document is not valid JSON");
            Error::CorruptDocument(e.to_string())
        })?;
        Self::from_document(document, registry)
    }

    pub fn from_records(records: GraphDocument, registry: &AttributeRegistry) -> Result<Self> {
        let GraphDocument { layer_ids, nodes, edges, dynamic_layers, mesh } = records;
        let mut graph = SceneGraph::with_config(SceneGraphConfig::new(layer_ids));

        let (mut dynamic, fixed): (Vec<_>, Vec<_>) = nodes.into_iter().partition(|n| n.timestamp.is_some());
        for record in fixed {
            let attributes = registry.nodes.create(&record.attributes)?;
            graph.emplace_node(record.layer, record.id, attributes).map_err(structural)?;
        }

        // Each dynamic layer is replayed oldest first so its counter and
        // clock advance exactly as they did when the nodes were emplaced.
        dynamic.sort_by_key(|n| n.timestamp);
        for record in dynamic {
            let attributes = registry.nodes.create(&record.attributes)?;
            let timestamp = Duration::from_nanos(record.timestamp.unwrap_or_default());
            graph
                .restore_dynamic_node(record.layer, record.id, timestamp, attributes)
                .map_err(structural)?;
        }
        for record in dynamic_layers {
            let last_timestamp = record.last_timestamp.map(Duration::from_nanos);
            graph
                .resume_dynamic_layer(record.layer, record.prefix, record.next_index, last_timestamp)
                .map_err(structural)?;
        }

        for record in edges {
            let info = registry.edges.create(&record.attributes)?;
            graph.insert_edge_with(record.source, record.target, info).map_err(structural)?;
        }

        graph.mesh = mesh;
        Ok(graph)
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Write the document to `path`, indented when the graph's config asks
    /// for it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let records = self.to_records()?;
        let text = if self.config().pretty_print {
            serde_json::to_string_pretty(&records)
        } else {
            serde_json::to_string(&records)
        }
        .map_err(|e| Error::CorruptDocument(e.to_string()))?;

        std::fs::write(path, text)?;
        tracing::info!(path = %path.display(), nodes = self.num_nodes(), edges = self.num_edges(), "saved scene graph");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, registry: &AttributeRegistry) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let graph = Self::deserialize(&text, registry)?;
        tracing::info!(path = %path.display(), nodes = graph.num_nodes(), edges = graph.num_edges(), "loaded scene graph");
        Ok(graph)
    }
}

/// Report graph-shape violations found while rebuilding as a corrupt
/// document. Attribute registry failures keep their own kind.
fn structural(error: Error) -> Error {
    match error {
        Error::UnknownAttributeType(_)
        | Error::MalformedRecord { .. }
        | Error::InvalidConstructor(_)
        | Error::CorruptDocument(_)
        | Error::Io(_) => error,
        other => Error::CorruptDocument(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
