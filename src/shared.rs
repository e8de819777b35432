//! Shared, lock-protected scene graph handle.
//!
//! [`SceneGraph`] itself does no locking. Callers that need many readers
//! alongside an occasional writer share one of these instead: reads take
//! the lock in shared mode, writes take it exclusively.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::graph::SceneGraph;

/// Cloneable handle to one graph behind a `parking_lot::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct SharedSceneGraph {
    inner: Arc<RwLock<SceneGraph>>,
}

impl SharedSceneGraph {
    pub fn new(graph: SceneGraph) -> Self {
        Self { inner: Arc::new(RwLock::new(graph)) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SceneGraph> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SceneGraph> {
        self.inner.write()
    }

    /// Deep copy of the current state, taken under the read lock.
    pub fn snapshot(&self) -> SceneGraph {
        self.inner.read().clone()
    }

    /// Unwrap the graph if this is the last handle, otherwise hand the
    /// handle back.
    pub fn into_inner(self) -> Result<SceneGraph, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<SceneGraph> for SharedSceneGraph {
    fn from(graph: SceneGraph) -> Self {
        Self::new(graph)
    }
}
