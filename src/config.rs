//! Scene graph configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::LayerId;
use crate::{Error, Result};

/// Settings a [`SceneGraph`](crate::SceneGraph) is built from.
///
/// ```json
/// { "layer_ids": [2, 3, 4, 5], "pretty_print": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Layers the graph accepts nodes for. Dynamic layers may only be
    /// created under one of these ids.
    pub layer_ids: Vec<LayerId>,
    /// Indent files written by [`SceneGraph::save`](crate::SceneGraph::save).
    pub pretty_print: bool,
}

impl Default for SceneGraphConfig {
    /// Objects, places, rooms and buildings.
    fn default() -> Self {
        Self::new(LayerId::STANDARD)
    }
}

impl SceneGraphConfig {
    pub fn new(layer_ids: impl IntoIterator<Item = impl Into<LayerId>>) -> Self {
        Self {
            layer_ids: layer_ids.into_iter().map(Into::into).collect(),
            pretty_print: false,
        }
    }

    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
