use crate::error::TransportError;
use crate::transport::{
    ConnectionId, PeerTransport, TrackAttachment, TransportConfig, TransportEvent,
    TransportFactory,
};
use async_trait::async_trait;
use glimpse_core::{
    ConnectionState, IceCandidateJson, LocalTrack, MediaKind, PeerId, RemoteStream, RemoteTrack,
    SdpKind, SessionSdp,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Production transport over a native `RTCPeerConnection`, with
/// trickle ICE. Connection-state changes, gathered candidates and
/// inbound tracks are forwarded into the engine loop through
/// `events`, stamped with this transport's epoch.
pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    pub async fn new(
        remote: PeerId,
        conn: ConnectionId,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        let state_peer = remote.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let peer = state_peer.clone();
            Box::pin(async move {
                debug!(%peer, state = %s, "peer connection state changed");
                if let Some(state) = map_state(s) {
                    let _ = tx
                        .send(TransportEvent::StateChanged { conn, peer, state })
                        .await;
                }
            })
        }));

        let ice_tx = events.clone();
        let ice_peer = remote.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = ice_peer.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else { return };
                let candidate = IceCandidateJson {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGathered {
                        conn,
                        peer,
                        candidate,
                    })
                    .await;
            })
        }));

        let track_tx = events;
        let track_peer = remote;
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let tx = track_tx.clone();
                let peer = track_peer.clone();
                Box::pin(async move {
                    let Some(kind) = map_kind(track.kind()) else {
                        return;
                    };
                    info!(%peer, kind = kind.as_str(), "inbound remote track");
                    let stream = RemoteStream {
                        stream_id: track.stream_id(),
                        tracks: vec![RemoteTrack { kind, rtp: track }],
                    };
                    let _ = tx
                        .send(TransportEvent::TrackReceived { conn, peer, stream })
                        .await;
                })
            },
        ));

        Ok(Self { pc })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionSdp, TransportError> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer.clone()).await?;
        Ok(SessionSdp::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionSdp, TransportError> {
        let answer = self.pc.create_answer(None).await?;
        self.pc.set_local_description(answer.clone()).await?;
        Ok(SessionSdp::answer(answer.sdp))
    }

    async fn set_remote_description(&self, description: SessionSdp) -> Result<(), TransportError> {
        let desc = match description.kind {
            SdpKind::Offer => RTCSessionDescription::offer(description.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(description.sdp)?,
        };
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateJson) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| TransportError::MalformedCandidate(e.to_string()))
    }

    async fn publish_track(&self, track: &LocalTrack) -> Result<TrackAttachment, TransportError> {
        let codec_type = codec_type(track.kind);
        for sender in self.pc.get_senders().await {
            let Some(existing) = sender.track().await else {
                continue;
            };
            if existing.kind() == codec_type {
                sender.replace_track(Some(track.rtp.clone())).await?;
                return Ok(TrackAttachment::Replaced);
            }
        }
        self.pc.add_track(track.rtp.clone()).await?;
        Ok(TrackAttachment::Added)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.pc.close().await?;
        Ok(())
    }
}

pub struct WebRtcFactory;

#[async_trait]
impl TransportFactory for WebRtcFactory {
    async fn create(
        &self,
        remote: PeerId,
        conn: ConnectionId,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        Ok(Arc::new(
            WebRtcTransport::new(remote, conn, config, events).await?,
        ))
    }
}

fn map_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        // New and Closed carry no lifecycle information: construction
        // starts at Idle and Closed only follows a local close().
        _ => None,
    }
}

fn map_kind(kind: RTPCodecType) -> Option<MediaKind> {
    match kind {
        RTPCodecType::Audio => Some(MediaKind::Audio),
        RTPCodecType::Video => Some(MediaKind::Video),
        RTPCodecType::Unspecified => None,
    }
}

fn codec_type(kind: MediaKind) -> RTPCodecType {
    match kind {
        MediaKind::Audio => RTPCodecType::Audio,
        MediaKind::Video => RTPCodecType::Video,
    }
}
