//! # Scene Graph Model
//!
//! Plain data that every other module passes around: identifiers, nodes
//! and edges. No graph bookkeeping lives here.

pub mod edge;
pub mod id;
pub mod node;

pub use edge::{EdgeKey, SceneGraphEdge};
pub use id::{LayerId, LayerKey, NodeId, NodeSymbol, MAX_CATEGORY, MAX_INDEX};
pub use node::SceneGraphNode;
