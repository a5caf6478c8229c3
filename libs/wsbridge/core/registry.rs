//! Connection registry
//!
//! Maps connection ids to live handles. The registry is the only shared
//! mutable structure of a bridge; every operation takes the lock for a single
//! map operation and never across network I/O.

use crate::handle::ConnectionHandle;
use crate::traits::ConnectionId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Concurrency-safe id → handle table
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under `id`
    ///
    /// An id holds at most one handle: if `id` is taken the map is left
    /// untouched and the rejected handle is handed back.
    pub fn put(
        &self,
        id: ConnectionId,
        handle: ConnectionHandle,
    ) -> std::result::Result<(), ConnectionHandle> {
        let mut connections = self.connections.write();
        if connections.contains_key(&id) {
            return Err(handle);
        }
        connections.insert(id, handle);
        Ok(())
    }

    /// Look up the handle for `id`
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.read().get(&id).cloned()
    }

    /// Unconditionally remove `id`
    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.write().remove(&id)
    }

    /// Remove `id` only if it still maps to the handle carrying `token`
    pub fn remove_if(&self, id: ConnectionId, token: u64) -> bool {
        let mut connections = self.connections.write();
        match connections.get(&id) {
            Some(handle) if handle.token() == token => {
                connections.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Take every handle out of the registry
    pub fn drain(&self) -> Vec<(ConnectionId, ConnectionHandle)> {
        let mut connections = self.connections.write();
        std::mem::take(&mut *connections).into_iter().collect()
    }
}
