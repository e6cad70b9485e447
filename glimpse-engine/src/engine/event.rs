use crate::error::{RelayError, TransportError};
use glimpse_core::{ConnectionState, PeerId, RemoteStream};

/// Notifications pushed to the embedding application.
pub enum EngineEvent {
    ConnectionStateChanged {
        peer: PeerId,
        state: ConnectionState,
    },
    RemoteStreamReceived {
        peer: PeerId,
        stream: RemoteStream,
    },
    /// Negotiation with one peer failed; every other connection is
    /// unaffected. Retrying is the caller's decision.
    NegotiationFailed {
        peer: PeerId,
        error: TransportError,
    },
    RelayError(RelayError),
}
