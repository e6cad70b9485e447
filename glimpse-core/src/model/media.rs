use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// A locally captured track. Shared read-only across every peer
/// connection; pausing disables it without detaching any sender.
#[derive(Clone)]
pub struct LocalTrack {
    pub kind: MediaKind,
    enabled: Arc<AtomicBool>,
    pub rtp: Arc<dyn TrackLocal + Send + Sync>,
}

impl LocalTrack {
    pub fn new(kind: MediaKind, rtp: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        Self {
            kind,
            enabled: Arc::new(AtomicBool::new(true)),
            rtp,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

/// The local capture stream, already acquired by the caller. The
/// engine only attaches it; it never starts or stops capture.
#[derive(Clone, Default)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<LocalTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: LocalTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn track_of(&self, kind: MediaKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }
}

#[derive(Clone)]
pub struct RemoteTrack {
    pub kind: MediaKind,
    pub rtp: Arc<TrackRemote>,
}

/// Inbound media for one remote peer. On the viewer side this is
/// simply "the host's stream".
#[derive(Clone, Default)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<RemoteTrack>,
}
