use async_trait::async_trait;
use glimpse_core::{
    ConnectionState, IceCandidateJson, LocalTrack, MediaKind, PeerId, RemoteStream, SessionSdp,
};
use glimpse_engine::{
    ConnectionId, PeerTransport, TrackAttachment, TransportConfig, TransportError, TransportEvent,
    TransportFactory,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Every call a test transport has seen, in order.
#[derive(Debug, Clone)]
pub enum TransportCall {
    CreateOffer,
    CreateAnswer,
    SetRemoteDescription(SessionSdp),
    AddIceCandidate(IceCandidateJson),
    PublishTrack(MediaKind, TrackAttachment),
    Close,
}

/// In-memory transport that records every call and lets tests inject
/// transport events as if the network produced them.
pub struct FakeTransport {
    pub remote: PeerId,
    pub conn: ConnectionId,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    sender_kinds: Arc<Mutex<Vec<MediaKind>>>,
    fail_offers: Arc<AtomicBool>,
    fail_candidates: Arc<AtomicBool>,
    events: mpsc::Sender<TransportEvent>,
}

impl FakeTransport {
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    pub async fn applied_candidates(&self) -> Vec<IceCandidateJson> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::AddIceCandidate(candidate) => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn published(&self) -> Vec<(MediaKind, TrackAttachment)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::PublishTrack(kind, attachment) => Some((*kind, *attachment)),
                _ => None,
            })
            .collect()
    }

    pub async fn offer_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| matches!(call, TransportCall::CreateOffer))
            .count()
    }

    pub async fn was_closed(&self) -> bool {
        self.calls
            .lock()
            .await
            .iter()
            .any(|call| matches!(call, TransportCall::Close))
    }

    /// Simulate a native connection state transition.
    pub async fn emit_state(&self, state: ConnectionState) {
        let _ = self
            .events
            .send(TransportEvent::StateChanged {
                conn: self.conn,
                peer: self.remote.clone(),
                state,
            })
            .await;
    }

    /// Simulate a locally gathered ICE candidate.
    pub async fn emit_candidate(&self, candidate: IceCandidateJson) {
        let _ = self
            .events
            .send(TransportEvent::CandidateGathered {
                conn: self.conn,
                peer: self.remote.clone(),
                candidate,
            })
            .await;
    }

    /// Simulate inbound remote media.
    pub async fn emit_stream(&self, stream: RemoteStream) {
        let _ = self
            .events
            .send(TransportEvent::TrackReceived {
                conn: self.conn,
                peer: self.remote.clone(),
                stream,
            })
            .await;
    }

    async fn record(&self, call: TransportCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn create_offer(&self) -> Result<SessionSdp, TransportError> {
        self.record(TransportCall::CreateOffer).await;
        if self.fail_offers.load(Ordering::SeqCst) {
            return Err(TransportError::WebRtc(webrtc::Error::new(
                "offer generation failed".to_owned(),
            )));
        }
        Ok(SessionSdp::offer(format!("v=0 offer-for-{}", self.remote)))
    }

    async fn create_answer(&self) -> Result<SessionSdp, TransportError> {
        self.record(TransportCall::CreateAnswer).await;
        Ok(SessionSdp::answer(format!("v=0 answer-for-{}", self.remote)))
    }

    async fn set_remote_description(&self, description: SessionSdp) -> Result<(), TransportError> {
        self.record(TransportCall::SetRemoteDescription(description))
            .await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateJson) -> Result<(), TransportError> {
        self.record(TransportCall::AddIceCandidate(candidate)).await;
        if self.fail_candidates.load(Ordering::SeqCst) {
            return Err(TransportError::MalformedCandidate(
                "unparsable candidate line".to_owned(),
            ));
        }
        Ok(())
    }

    async fn publish_track(&self, track: &LocalTrack) -> Result<TrackAttachment, TransportError> {
        let mut kinds = self.sender_kinds.lock().await;
        let attachment = if kinds.contains(&track.kind) {
            TrackAttachment::Replaced
        } else {
            kinds.push(track.kind);
            TrackAttachment::Added
        };
        drop(kinds);
        self.record(TransportCall::PublishTrack(track.kind, attachment))
            .await;
        Ok(attachment)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Close).await;
        Ok(())
    }
}

/// Factory handing out [`FakeTransport`]s and keeping every created
/// instance reachable for verification.
#[derive(Clone, Default)]
pub struct FakeFactory {
    created: Arc<Mutex<Vec<Arc<FakeTransport>>>>,
    fail_offers: Arc<AtomicBool>,
    fail_candidates: Arc<AtomicBool>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn created(&self) -> Vec<Arc<FakeTransport>> {
        self.created.lock().await.clone()
    }

    pub async fn created_count(&self) -> usize {
        self.created.lock().await.len()
    }

    /// The most recent transport created for `remote`.
    pub async fn transport_for(&self, remote: &PeerId) -> Option<Arc<FakeTransport>> {
        self.created
            .lock()
            .await
            .iter()
            .rev()
            .find(|transport| transport.remote == *remote)
            .cloned()
    }

    pub fn set_fail_offers(&self, fail: bool) {
        self.fail_offers.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_candidates(&self, fail: bool) {
        self.fail_candidates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for FakeFactory {
    async fn create(
        &self,
        remote: PeerId,
        conn: ConnectionId,
        _config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let transport = Arc::new(FakeTransport {
            remote,
            conn,
            calls: Arc::new(Mutex::new(Vec::new())),
            sender_kinds: Arc::new(Mutex::new(Vec::new())),
            fail_offers: self.fail_offers.clone(),
            fail_candidates: self.fail_candidates.clone(),
            events,
        });
        self.created.lock().await.push(transport.clone());
        Ok(transport)
    }
}
