use crate::error::TransportError;
use crate::transport::{PeerTransport, TrackAttachment};
use glimpse_core::MediaStream;

/// Holds the shared local stream and applies it to peer transports.
/// The stream is shared read-only across connections and never owned
/// by any single one.
#[derive(Default)]
pub struct TrackPublisher {
    stream: Option<MediaStream>,
    paused: bool,
}

impl TrackPublisher {
    /// Swap the local stream. Setting `None` detaches nothing: absence
    /// of media is expressed through the senders going quiet, and
    /// pause through disabled tracks.
    pub fn set_stream(&mut self, stream: Option<MediaStream>) {
        self.stream = stream;
        self.apply_pause();
    }

    /// Pause maps to per-track enable/disable, not detachment.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.apply_pause();
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    fn apply_pause(&self) {
        if let Some(stream) = &self.stream {
            for track in &stream.tracks {
                track.set_enabled(!self.paused);
            }
        }
    }

    /// Attach every known local track to `transport`: same-kind
    /// senders are replaced in place, anything else becomes a fresh
    /// `Added` sender.
    pub async fn apply_to(
        &self,
        transport: &dyn PeerTransport,
    ) -> Result<Vec<TrackAttachment>, TransportError> {
        let Some(stream) = &self.stream else {
            return Ok(Vec::new());
        };
        let mut attachments = Vec::with_capacity(stream.tracks.len());
        for track in &stream.tracks {
            attachments.push(transport.publish_track(track).await?);
        }
        Ok(attachments)
    }
}
