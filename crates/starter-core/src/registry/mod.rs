use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use starter_model::BuildId;

use crate::{error::LifecycleError, node::NodeRef};

/// In-memory registry of running builds.
///
/// The single authority on "is this build still running": the start handler
/// populates it, the exit watcher depopulates it, the stop handler only reads.
#[derive(Clone, Default)]
pub struct BuildRegistry {
    inner: Arc<RwLock<HashMap<BuildId, NodeRef>>>,
}

impl BuildRegistry {
    /// Create empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly launched node.
    ///
    /// An id that is already present is never overwritten.
    pub fn register(&self, id: BuildId, node: NodeRef) -> Result<(), LifecycleError> {
        let mut inner = self.write();
        if inner.contains_key(&id) {
            return Err(LifecycleError::AlreadyRegistered(id));
        }
        inner.insert(id, node);
        Ok(())
    }

    /// Remove a build; returns the handle if it was present.
    ///
    /// Absent ids are a no-op: termination may race with natural exit.
    pub fn unregister(&self, id: &BuildId) -> Option<NodeRef> {
        self.write().remove(id)
    }

    pub fn contains(&self, id: &BuildId) -> bool {
        self.read().contains_key(id)
    }

    /// Get the termination handle of a running build.
    pub fn get(&self, id: &BuildId) -> Option<NodeRef> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sorted snapshot of the registered ids.
    pub fn build_ids(&self) -> Vec<BuildId> {
        let mut ids: Vec<BuildId> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BuildId, NodeRef>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BuildId, NodeRef>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
