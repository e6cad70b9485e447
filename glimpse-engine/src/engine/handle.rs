use crate::engine::command::EngineCommand;
use crate::engine::ConnectionInfo;
use crate::error::EngineError;
use glimpse_core::{ConnectionState, MediaStream, PeerId, RemoteStream};
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front door to a running engine. When the last handle is
/// dropped the command channel closes and the engine cleans up and
/// exits on its own.
#[derive(Clone)]
pub struct EngineHandle {
    pub(super) command_tx: mpsc::Sender<EngineCommand>,
    pub(super) state_rx: watch::Receiver<ConnectionState>,
    pub(super) remote_rx: watch::Receiver<Option<RemoteStream>>,
}

impl EngineHandle {
    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| EngineError::Terminated)
    }

    /// Host side: start negotiating with a newly approved viewer.
    pub async fn create_offer(&self, viewer: PeerId) -> Result<(), EngineError> {
        self.send(EngineCommand::CreateOffer { viewer }).await
    }

    /// Attach (or detach) the already-acquired capture stream across
    /// every live connection.
    pub async fn set_local_stream(&self, stream: Option<MediaStream>) -> Result<(), EngineError> {
        self.send(EngineCommand::SetLocalStream(stream)).await
    }

    pub async fn set_paused(&self, paused: bool) -> Result<(), EngineError> {
        self.send(EngineCommand::SetPaused(paused)).await
    }

    /// Current lifecycle state: the most recent transition across all
    /// connections.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Viewer side: the host's inbound stream, once negotiated.
    pub fn remote_stream(&self) -> Option<RemoteStream> {
        self.remote_rx.borrow().clone()
    }

    pub fn remote_stream_changes(&self) -> watch::Receiver<Option<RemoteStream>> {
        self.remote_rx.clone()
    }

    /// Read-only view of every live connection.
    pub async fn snapshot(&self) -> Result<Vec<ConnectionInfo>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| EngineError::Terminated)
    }

    /// Close every connection, drop the relay subscription and reset
    /// to idle. Safe to call any number of times.
    pub async fn cleanup(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Cleanup(tx)).await?;
        rx.await.map_err(|_| EngineError::Terminated)
    }
}
