use crate::error::RelayError;
use crate::relay::SignalingRelay;
use async_trait::async_trait;
use dashmap::DashMap;
use glimpse_core::SignalMessage;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

const TOPIC_CAPACITY: usize = 64;

/// In-process fan-out hub: one broadcast channel per room topic.
/// Messages published before a subscriber joins are never redelivered,
/// matching the wire relay's no-persistence contract.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    topics: Arc<DashMap<String, broadcast::Sender<SignalMessage>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(&self, name: &str) -> BroadcastRelay {
        let tx = self
            .topics
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone();
        BroadcastRelay { tx }
    }
}

/// One room topic of a [`BroadcastHub`].
#[derive(Clone)]
pub struct BroadcastRelay {
    tx: broadcast::Sender<SignalMessage>,
}

#[async_trait]
impl SignalingRelay for BroadcastRelay {
    async fn publish(&self, message: SignalMessage) -> Result<(), RelayError> {
        // No subscribers yet is not an error: delivery is best-effort.
        let _ = self.tx.send(message);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<SignalMessage>, RelayError> {
        let mut rx = self.tx.subscribe();
        let (out_tx, out_rx) = mpsc::channel(TOPIC_CAPACITY);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if out_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "relay subscriber lagged behind the topic");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(out_rx)
    }

    async fn close(&self) -> Result<(), RelayError> {
        // The subscription ends when its receiver is dropped.
        Ok(())
    }
}
