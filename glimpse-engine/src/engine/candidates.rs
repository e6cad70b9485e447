use glimpse_core::{IceCandidateJson, PeerId};
use std::collections::HashMap;

/// Per-peer FIFO of candidates that arrived before that peer's remote
/// description could be applied. Each queue is drained exactly once;
/// candidates arriving afterwards are applied directly.
#[derive(Default)]
pub struct CandidateBuffer {
    queues: HashMap<PeerId, Vec<IceCandidateJson>>,
}

impl CandidateBuffer {
    pub fn enqueue(&mut self, peer: PeerId, candidate: IceCandidateJson) {
        self.queues.entry(peer).or_default().push(candidate);
    }

    /// Take the whole queue for `peer`, in arrival order.
    pub fn drain(&mut self, peer: &PeerId) -> Vec<IceCandidateJson> {
        self.queues.remove(peer).unwrap_or_default()
    }

    pub fn discard(&mut self, peer: &PeerId) {
        self.queues.remove(peer);
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
