use thiserror::Error;

/// Signaling relay failures. Non-fatal: surfaced once to the caller,
/// never retried by the engine.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("signaling relay unavailable: {0}")]
    Unavailable(String),
    #[error("signaling relay subscription closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed ICE candidate: {0}")]
    MalformedCandidate(String),
    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),
}

/// The only failure a handle call can hit: per-peer and relay
/// failures are reported through the event stream instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("negotiation engine is no longer running")]
    Terminated,
}
