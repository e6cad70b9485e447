mod broadcast;

pub use broadcast::{BroadcastHub, BroadcastRelay};

use crate::error::RelayError;
use async_trait::async_trait;
use glimpse_core::{PeerId, SignalBody, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

/// External broadcast relay for one room topic. Delivery is
/// best-effort fan-out: no ordering across senders, no persistence,
/// no acknowledgment. Message loss must be tolerated downstream.
#[async_trait]
pub trait SignalingRelay: Send + Sync {
    async fn publish(&self, message: SignalMessage) -> Result<(), RelayError>;

    /// Open the single inbound subscription for the topic.
    async fn subscribe(&self) -> Result<mpsc::Receiver<SignalMessage>, RelayError>;

    /// Release the transport-level subscription.
    async fn close(&self) -> Result<(), RelayError>;
}

/// Room-scoped client: stamps outbound messages with the local
/// identity and rejects inbound traffic not addressed to it.
pub struct RelayClient {
    relay: Arc<dyn SignalingRelay>,
    self_id: PeerId,
}

impl RelayClient {
    pub fn new(relay: Arc<dyn SignalingRelay>, self_id: PeerId) -> Self {
        Self { relay, self_id }
    }

    /// Whether an inbound message may reach any handler: never our own
    /// traffic, and never a message addressed to someone else.
    pub fn accepts(&self, message: &SignalMessage) -> bool {
        if message.from == self.self_id {
            return false;
        }
        match &message.to {
            Some(to) => *to == self.self_id,
            None => true,
        }
    }

    pub async fn send_to(&self, to: PeerId, body: SignalBody) -> Result<(), RelayError> {
        let message = SignalMessage::addressed(body, self.self_id.clone(), to);
        self.relay.publish(message).await
    }

    pub async fn subscribe(&self) -> Result<mpsc::Receiver<SignalMessage>, RelayError> {
        self.relay.subscribe().await
    }

    pub async fn close(&self) -> Result<(), RelayError> {
        self.relay.close().await
    }
}
