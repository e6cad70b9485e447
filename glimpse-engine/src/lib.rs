//! Signaling and peer-connection negotiation engine for one-host,
//! few-viewers live streaming.
//!
//! The engine relays typed signaling messages between exactly the
//! right pair of peers over a shared broadcast topic, drives each
//! remote peer's connection through its offer/answer/ICE lifecycle,
//! buffers candidates that arrive early, and attaches the shared
//! local stream across every live connection. Media always flows
//! peer to peer; the relay never sees it.

pub mod engine;
pub mod error;
pub mod membership;
pub mod relay;
pub mod transport;

pub use engine::{
    ConnectionInfo, EngineConfig, EngineEvent, EngineHandle, NegotiationEngine,
};
pub use error::{EngineError, RelayError, TransportError};
pub use membership::{AlwaysActive, RoomGate, RoomMembership};
pub use relay::{BroadcastHub, BroadcastRelay, RelayClient, SignalingRelay};
pub use transport::{
    ConnectionId, PeerTransport, TrackAttachment, TransportConfig, TransportEvent,
    TransportFactory, WebRtcFactory, WebRtcTransport,
};
