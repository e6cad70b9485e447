mod webrtc_transport;

pub use webrtc_transport::{WebRtcFactory, WebRtcTransport};

use crate::error::TransportError;
use async_trait::async_trait;
use glimpse_core::{
    ConnectionState, IceCandidateJson, IceServerConfig, LocalTrack, PeerId, RemoteStream,
    SessionSdp,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Monotonic epoch distinguishing successive transports for the same
/// remote. Events stamped with a superseded epoch are discarded, so a
/// closed transport can never touch its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
        }
    }
}

/// Events a transport pushes into the engine loop.
pub enum TransportEvent {
    CandidateGathered {
        conn: ConnectionId,
        peer: PeerId,
        candidate: IceCandidateJson,
    },
    StateChanged {
        conn: ConnectionId,
        peer: PeerId,
        state: ConnectionState,
    },
    TrackReceived {
        conn: ConnectionId,
        peer: PeerId,
        stream: RemoteStream,
    },
}

/// How a local track landed on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAttachment {
    /// An existing same-kind sender was swapped in place. No
    /// renegotiation needed.
    Replaced,
    /// A new sender was added, which requires renegotiation.
    Added,
}

/// One native media transport, exclusively owned by its registry
/// entry.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Generate and install the local offer.
    async fn create_offer(&self) -> Result<SessionSdp, TransportError>;

    /// Generate and install the local answer.
    async fn create_answer(&self) -> Result<SessionSdp, TransportError>;

    async fn set_remote_description(&self, description: SessionSdp) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidateJson) -> Result<(), TransportError>;

    /// Attach a local track, replacing an existing same-kind sender in
    /// place when one exists.
    async fn publish_track(&self, track: &LocalTrack) -> Result<TrackAttachment, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        remote: PeerId,
        conn: ConnectionId,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;
}
