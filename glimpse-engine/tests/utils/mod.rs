#![allow(dead_code)]

pub mod fake_transport;

pub use fake_transport::{FakeFactory, FakeTransport, TransportCall};

use async_trait::async_trait;
use glimpse_core::{
    ConnectionState, IceCandidateJson, LocalTrack, MediaKind, MediaStream, PeerId, RemoteStream,
    SessionRole, SignalMessage,
};
use glimpse_engine::{
    BroadcastRelay, EngineConfig, EngineEvent, EngineHandle, NegotiationEngine, RelayError,
    SignalingRelay,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Spawn an engine wired to a fake transport factory over the given
/// relay topic.
pub fn spawn_engine(
    role: SessionRole,
    relay: BroadcastRelay,
    factory: FakeFactory,
) -> (PeerId, EngineHandle, mpsc::UnboundedReceiver<EngineEvent>) {
    let self_id = PeerId::new();
    let config =
        EngineConfig::new(self_id.clone(), role, Arc::new(relay)).with_transports(Arc::new(factory));
    let (handle, events) = NegotiationEngine::spawn(config);
    (self_id, handle, events)
}

pub fn video_track() -> LocalTrack {
    let rtp = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            ..Default::default()
        },
        "video".to_owned(),
        "capture".to_owned(),
    ));
    LocalTrack::new(MediaKind::Video, rtp)
}

pub fn audio_track() -> LocalTrack {
    let rtp = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        "audio".to_owned(),
        "capture".to_owned(),
    ));
    LocalTrack::new(MediaKind::Audio, rtp)
}

pub fn video_stream() -> MediaStream {
    MediaStream::new("capture").with_track(video_track())
}

pub fn candidate(n: u32) -> IceCandidateJson {
    IceCandidateJson {
        candidate: format!("candidate:{n} 1 udp 2122260223 192.168.1.7 54555 typ host"),
        sdp_mid: Some("0".to_owned()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}

pub fn remote_stream(id: &str) -> RemoteStream {
    RemoteStream {
        stream_id: id.to_owned(),
        tracks: Vec::new(),
    }
}

pub async fn next_signal(rx: &mut mpsc::Receiver<SignalMessage>) -> SignalMessage {
    tokio::time::timeout(WAIT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a signaling message")
        .expect("signaling subscription closed")
}

/// Skip messages from other senders until one from `from` arrives.
pub async fn next_signal_from(
    rx: &mut mpsc::Receiver<SignalMessage>,
    from: &PeerId,
) -> SignalMessage {
    loop {
        let message = next_signal(rx).await;
        if message.from == *from {
            return message;
        }
    }
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
    tokio::time::timeout(WAIT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an engine event")
        .expect("engine event stream closed")
}

pub async fn wait_for_state(handle: &EngineHandle, target: ConnectionState) {
    let mut rx = handle.state_changes();
    let reached = async {
        while *rx.borrow_and_update() != target {
            if rx.changed().await.is_err() {
                panic!("engine stopped before reaching {target}");
            }
        }
    };
    if tokio::time::timeout(WAIT_TIMEOUT, reached).await.is_err() {
        panic!(
            "timed out waiting for state {target}, last seen {}",
            handle.connection_state()
        );
    }
}

/// Poll `condition` until it holds or the shared timeout expires.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if condition().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {WAIT_TIMEOUT:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Relay whose publish and subscribe always fail.
pub struct FailingRelay;

#[async_trait]
impl SignalingRelay for FailingRelay {
    async fn publish(&self, _message: SignalMessage) -> Result<(), RelayError> {
        Err(RelayError::Unavailable("relay offline".to_owned()))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<SignalMessage>, RelayError> {
        Err(RelayError::Unavailable("relay offline".to_owned()))
    }

    async fn close(&self) -> Result<(), RelayError> {
        Ok(())
    }
}
