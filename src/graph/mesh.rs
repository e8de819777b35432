//! Opaque mesh payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mesh attached to a scene graph. The graph never looks inside; it only
/// stores the document and writes it back out verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshBlob(Value);

impl MeshBlob {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for MeshBlob {
    fn from(document: Value) -> Self {
        Self(document)
    }
}
