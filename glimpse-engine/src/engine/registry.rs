use crate::transport::{ConnectionId, PeerTransport};
use glimpse_core::{ConnectionState, NegotiationRole, PeerId};
use std::collections::HashMap;
use std::sync::Arc;

/// One live peer connection. The registry is its exclusive owner; the
/// transport handle is closed when the entry is removed.
pub struct PeerHandle {
    pub remote: PeerId,
    pub conn: ConnectionId,
    pub transport: Arc<dyn PeerTransport>,
    pub role: NegotiationRole,
    pub state: ConnectionState,
    pub has_remote_description: bool,
}

/// The set of live connections, keyed by remote identity. At most one
/// entry per remote: inserting again supersedes.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PeerId, PeerHandle>,
}

impl ConnectionRegistry {
    /// Insert a handle, returning any superseded entry for the same
    /// remote. The caller is responsible for closing it.
    pub fn insert(&mut self, handle: PeerHandle) -> Option<PeerHandle> {
        self.connections.insert(handle.remote.clone(), handle)
    }

    pub fn get(&self, remote: &PeerId) -> Option<&PeerHandle> {
        self.connections.get(remote)
    }

    pub fn get_mut(&mut self, remote: &PeerId) -> Option<&mut PeerHandle> {
        self.connections.get_mut(remote)
    }

    pub fn remove(&mut self, remote: &PeerId) -> Option<PeerHandle> {
        self.connections.remove(remote)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerHandle> {
        self.connections.values()
    }

    pub fn drain(&mut self) -> Vec<PeerHandle> {
        self.connections.drain().map(|(_, handle)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
