use crate::engine::ConnectionInfo;
use glimpse_core::{MediaStream, PeerId};
use tokio::sync::oneshot;

/// Caller-side operations, serialized into the engine loop so they
/// never race transport callbacks or relay traffic.
pub enum EngineCommand {
    CreateOffer {
        viewer: PeerId,
    },
    SetLocalStream(Option<MediaStream>),
    SetPaused(bool),
    Snapshot(oneshot::Sender<Vec<ConnectionInfo>>),
    Cleanup(oneshot::Sender<()>),
}
