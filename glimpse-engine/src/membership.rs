use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Narrow view of the external room store: the only question the
/// engine asks is whether negotiation should proceed at all.
#[async_trait]
pub trait RoomMembership: Send + Sync {
    async fn is_room_active(&self) -> bool;
}

/// Stub for sessions without a backing store.
pub struct AlwaysActive;

#[async_trait]
impl RoomMembership for AlwaysActive {
    async fn is_room_active(&self) -> bool {
        true
    }
}

/// Flag-backed gate, flipped by whatever component tracks the room row.
#[derive(Clone, Default)]
pub struct RoomGate {
    active: Arc<AtomicBool>,
}

impl RoomGate {
    pub fn new(active: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(active)),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomMembership for RoomGate {
    async fn is_room_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
