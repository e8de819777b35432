//! # scene-graph-rs: Layered Scene Graph Store
//!
//! An in-memory, hierarchical graph of a physical environment: objects,
//! places, rooms and buildings on static layers, agent trajectories on
//! time-ordered dynamic layers, all serializable to one JSON document.
//!
//! ## Design Principles
//!
//! 1. **One id space**: every node id is unique across the whole graph
//! 2. **Open payloads**: attributes are trait objects, resurrected by tag
//!    through an explicitly passed [`AttributeRegistry`]
//! 3. **Validate, then commit**: a failed mutation changes nothing
//! 4. **Symbols as ids**: a [`NodeId`] packs a category character and an index
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use scene_graph_rs::{AttributeRegistry, BasicNodeAttributes, SceneGraph};
//!
//! # fn example() -> scene_graph_rs::Result<()> {
//! let mut graph = SceneGraph::new([1u64, 2, 3]);
//! graph.emplace_node(1u64, 0u64, BasicNodeAttributes::default().boxed())?;
//! graph.emplace_node(1u64, 1u64, BasicNodeAttributes::default().boxed())?;
//! graph.insert_edge(0u64, 1u64)?;
//!
//! let agent = graph.emplace_dynamic_node(
//!     2u64,
//!     'a',
//!     Duration::from_nanos(10),
//!     BasicNodeAttributes::default().boxed(),
//!     true,
//! )?;
//! graph.insert_edge(agent, 1u64)?;
//!
//! let text = graph.serialize()?;
//! let restored = SceneGraph::deserialize(&text, &AttributeRegistry::with_defaults())?;
//! assert_eq!(restored.num_edges(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`model`] | Ids, layer keys, nodes and edges |
//! | [`attributes`] | Attribute payloads, document codec, constructor registry |
//! | [`layer`] | Static and dynamic layers |
//! | [`graph`] | The [`SceneGraph`] orchestrator and its JSON document |
//! | [`config`] | [`SceneGraphConfig`] |
//! | [`shared`] | [`SharedSceneGraph`] for concurrent readers |

use std::time::Duration;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod attributes;
pub mod layer;
pub mod graph;
pub mod config;
pub mod shared;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    EdgeKey, LayerId, LayerKey, NodeId, NodeSymbol,
    SceneGraphEdge, SceneGraphNode,
};

// ============================================================================
// Re-exports: Attributes
// ============================================================================

pub use attributes::{
    AttributeRegistry, AttributeValue, BasicEdgeAttributes, BasicNodeAttributes,
    EdgeAttributes, NodeAttributes, PlaceNodeAttributes, SemanticNodeAttributes,
};

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use config::SceneGraphConfig;
pub use graph::{MeshBlob, SceneGraph};
pub use layer::{DynamicSceneGraphLayer, SceneGraphLayer};
pub use shared::SharedSceneGraph;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge: {0} -> {1}")]
    DuplicateEdge(NodeId, NodeId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0} -> {1}")]
    EdgeNotFound(NodeId, NodeId),

    #[error("Unknown layer: {0}")]
    UnknownLayer(LayerId),

    #[error("Invalid edge: self-loop on {0}")]
    InvalidEdge(NodeId),

    #[error("Out-of-order timestamp in layer {layer}: {given:?} is not after {last:?}")]
    OutOfOrderTimestamp { layer: LayerKey, last: Duration, given: Duration },

    #[error("Identifier overflow: category {category:?} index {index}")]
    IdentifierOverflow { category: char, index: u64 },

    #[error("Unknown attribute type: {0}")]
    UnknownAttributeType(String),

    #[error("Malformed attribute record: {reason}")]
    MalformedRecord { reason: String, record: serde_json::Value },

    #[error("No constructor registered for attribute type: {0}")]
    InvalidConstructor(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
