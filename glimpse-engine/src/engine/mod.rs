mod candidates;
mod command;
mod event;
mod handle;
mod publisher;
mod registry;

pub use candidates::CandidateBuffer;
pub use command::EngineCommand;
pub use event::EngineEvent;
pub use handle::EngineHandle;
pub use publisher::TrackPublisher;
pub use registry::{ConnectionRegistry, PeerHandle};

use crate::error::TransportError;
use crate::membership::{AlwaysActive, RoomMembership};
use crate::relay::{RelayClient, SignalingRelay};
use crate::transport::{
    ConnectionId, PeerTransport, TrackAttachment, TransportConfig, TransportEvent,
    TransportFactory, WebRtcFactory,
};
use glimpse_core::{
    ConnectionState, IceCandidateJson, MediaStream, NegotiationRole, PeerId, RemoteStream,
    SessionRole, SessionSdp, SignalBody, SignalMessage,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 64;
const TRANSPORT_CAPACITY: usize = 256;

/// Read-only view of one registry entry.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub remote: PeerId,
    pub role: NegotiationRole,
    pub state: ConnectionState,
}

/// Everything one room session needs to negotiate: its identity, its
/// role, and the external collaborators.
pub struct EngineConfig {
    pub self_id: PeerId,
    pub role: SessionRole,
    pub relay: Arc<dyn SignalingRelay>,
    pub transports: Arc<dyn TransportFactory>,
    pub membership: Arc<dyn RoomMembership>,
    pub transport_config: TransportConfig,
}

impl EngineConfig {
    pub fn new(self_id: PeerId, role: SessionRole, relay: Arc<dyn SignalingRelay>) -> Self {
        Self {
            self_id,
            role,
            relay,
            transports: Arc::new(WebRtcFactory),
            membership: Arc::new(AlwaysActive),
            transport_config: TransportConfig::default(),
        }
    }

    pub fn with_transports(mut self, transports: Arc<dyn TransportFactory>) -> Self {
        self.transports = transports;
        self
    }

    pub fn with_membership(mut self, membership: Arc<dyn RoomMembership>) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }
}

/// Single-owner actor driving every peer connection for one room
/// session. Inbound relay messages, transport callbacks and caller
/// commands are all serialized onto its loop, so the registry and
/// candidate buffer are never touched concurrently.
pub struct NegotiationEngine {
    self_id: PeerId,
    role: SessionRole,
    relay: RelayClient,
    transports: Arc<dyn TransportFactory>,
    membership: Arc<dyn RoomMembership>,
    transport_config: TransportConfig,
    registry: ConnectionRegistry,
    candidates: CandidateBuffer,
    publisher: TrackPublisher,
    next_conn: u64,
    command_rx: mpsc::Receiver<EngineCommand>,
    inbound: mpsc::Receiver<SignalMessage>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    state_tx: watch::Sender<ConnectionState>,
    remote_tx: watch::Sender<Option<RemoteStream>>,
}

impl NegotiationEngine {
    /// Spawn the engine onto the runtime and hand back its API surface
    /// plus the application-facing event stream.
    pub fn spawn(config: EngineConfig) -> (EngineHandle, mpsc::UnboundedReceiver<EngineEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (remote_tx, remote_rx) = watch::channel(None);

        let engine = Self {
            relay: RelayClient::new(config.relay, config.self_id.clone()),
            self_id: config.self_id,
            role: config.role,
            transports: config.transports,
            membership: config.membership,
            transport_config: config.transport_config,
            registry: ConnectionRegistry::default(),
            candidates: CandidateBuffer::default(),
            publisher: TrackPublisher::default(),
            next_conn: 0,
            command_rx,
            inbound: closed_inbound(),
            transport_rx,
            transport_tx,
            event_tx,
            state_tx,
            remote_tx,
        };
        tokio::spawn(engine.run());

        (
            EngineHandle {
                command_tx,
                state_rx,
                remote_rx,
            },
            event_rx,
        )
    }

    async fn run(mut self) {
        match self.relay.subscribe().await {
            Ok(rx) => self.inbound = rx,
            Err(error) => {
                // Non-fatal: the caller decides whether to recreate the
                // engine. Commands still work without inbound signaling.
                warn!(peer = %self.self_id, "relay subscription failed: {error}");
                let _ = self.event_tx.send(EngineEvent::RelayError(error));
            }
        }

        info!(peer = %self.self_id, role = ?self.role, "negotiation engine started");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!(peer = %self.self_id, "all handles dropped, tearing down");
                        self.cleanup().await;
                        break;
                    }
                },
                Some(message) = self.inbound.recv() => self.handle_signal(message).await,
                Some(event) = self.transport_rx.recv() => self.handle_transport_event(event).await,
            }
        }

        info!(peer = %self.self_id, "negotiation engine stopped");
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::CreateOffer { viewer } => self.create_offer(viewer).await,
            EngineCommand::SetLocalStream(stream) => self.set_local_stream(stream).await,
            EngineCommand::SetPaused(paused) => self.publisher.set_paused(paused),
            EngineCommand::Snapshot(reply) => {
                let infos = self
                    .registry
                    .iter()
                    .map(|handle| ConnectionInfo {
                        remote: handle.remote.clone(),
                        role: handle.role,
                        state: handle.state,
                    })
                    .collect();
                let _ = reply.send(infos);
            }
            EngineCommand::Cleanup(reply) => {
                self.cleanup().await;
                let _ = reply.send(());
            }
        }
    }

    /// The single dispatch point for inbound signaling.
    async fn handle_signal(&mut self, message: SignalMessage) {
        if !self.relay.accepts(&message) {
            return;
        }
        let SignalMessage { body, from, .. } = message;
        match body {
            SignalBody::Offer(sdp) => self.handle_offer(from, sdp).await,
            SignalBody::Answer(sdp) => self.handle_answer(from, sdp).await,
            SignalBody::IceCandidate(candidate) => self.handle_ice_candidate(from, candidate).await,
        }
    }

    /// Host path: negotiate with a newly approved viewer. An existing
    /// connection for the same remote is superseded, never duplicated.
    async fn create_offer(&mut self, viewer: PeerId) {
        if !self.membership.is_room_active().await {
            debug!(peer = %viewer, "room inactive, not offering");
            return;
        }

        let Some((conn, transport)) = self.open_transport(&viewer).await else {
            return;
        };

        if let Err(error) = self.publisher.apply_to(transport.as_ref()).await {
            warn!(peer = %viewer, "failed to attach local tracks: {error}");
        }

        match transport.create_offer().await {
            Ok(offer) => {
                self.registry.insert(PeerHandle {
                    remote: viewer.clone(),
                    conn,
                    transport,
                    role: NegotiationRole::Offerer,
                    state: ConnectionState::Connecting,
                    has_remote_description: false,
                });
                self.publish_state(&viewer, ConnectionState::Connecting);
                self.send_signal(viewer, SignalBody::Offer(offer)).await;
            }
            Err(error) => {
                let _ = transport.close().await;
                self.fail_peer(viewer, error).await;
            }
        }
    }

    /// Answerer path. A repeated offer for a live remote is treated as
    /// renegotiation: close and replace, never error.
    async fn handle_offer(&mut self, from: PeerId, offer: SessionSdp) {
        if !self.membership.is_room_active().await {
            debug!(peer = %from, "room inactive, ignoring offer");
            return;
        }

        let Some((conn, transport)) = self.open_transport(&from).await else {
            return;
        };

        if let Err(error) = self.publisher.apply_to(transport.as_ref()).await {
            warn!(peer = %from, "failed to attach local tracks: {error}");
        }

        if let Err(error) = transport.set_remote_description(offer).await {
            let _ = transport.close().await;
            self.fail_peer(from, error).await;
            return;
        }

        self.drain_candidates(&from, transport.as_ref()).await;

        match transport.create_answer().await {
            Ok(answer) => {
                self.registry.insert(PeerHandle {
                    remote: from.clone(),
                    conn,
                    transport,
                    role: NegotiationRole::Answerer,
                    state: ConnectionState::Connecting,
                    has_remote_description: true,
                });
                self.publish_state(&from, ConnectionState::Connecting);
                self.send_signal(from, SignalBody::Answer(answer)).await;
            }
            Err(error) => {
                let _ = transport.close().await;
                self.fail_peer(from, error).await;
            }
        }
    }

    /// Offerer path: answers are routed strictly by `from`. An answer
    /// with no matching live connection is a normal race, dropped
    /// without side effects.
    async fn handle_answer(&mut self, from: PeerId, answer: SessionSdp) {
        let Some(handle) = self.registry.get(&from) else {
            debug!(peer = %from, "dropping stale answer");
            return;
        };
        if handle.role != NegotiationRole::Offerer || handle.has_remote_description {
            debug!(peer = %from, "dropping answer for a connection not awaiting one");
            return;
        }

        let transport = handle.transport.clone();
        if let Err(error) = transport.set_remote_description(answer).await {
            self.fail_peer(from, error).await;
            return;
        }
        if let Some(handle) = self.registry.get_mut(&from) {
            handle.has_remote_description = true;
        }
        self.drain_candidates(&from, transport.as_ref()).await;
    }

    /// Apply immediately once the remote description exists, buffer
    /// otherwise. Rejected candidates are logged and dropped; they
    /// never fail the connection.
    async fn handle_ice_candidate(&mut self, from: PeerId, candidate: IceCandidateJson) {
        let ready = self
            .registry
            .get(&from)
            .map(|handle| (handle.has_remote_description, handle.transport.clone()));
        match ready {
            Some((true, transport)) => {
                if let Err(error) = transport.add_ice_candidate(candidate).await {
                    warn!(peer = %from, "dropping candidate: {error}");
                }
            }
            _ => self.candidates.enqueue(from, candidate),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGathered {
                conn,
                peer,
                candidate,
            } => {
                if !self.is_current(&peer, conn) {
                    debug!(peer = %peer, "discarding candidate from superseded transport");
                    return;
                }
                self.send_signal(peer, SignalBody::IceCandidate(candidate))
                    .await;
            }
            TransportEvent::StateChanged { conn, peer, state } => {
                if !self.is_current(&peer, conn) {
                    debug!(peer = %peer, "discarding state change from superseded transport");
                    return;
                }
                if state == ConnectionState::Failed {
                    // Terminal for this connection: close and remove.
                    // Retrying means a fresh offer, decided by the caller.
                    if let Some(handle) = self.registry.remove(&peer) {
                        let _ = handle.transport.close().await;
                    }
                    self.candidates.discard(&peer);
                }
                self.publish_state(&peer, state);
            }
            TransportEvent::TrackReceived { conn, peer, stream } => {
                if !self.is_current(&peer, conn) {
                    return;
                }
                info!(peer = %peer, stream = %stream.stream_id, "remote stream received");
                self.remote_tx.send_replace(Some(stream.clone()));
                let _ = self
                    .event_tx
                    .send(EngineEvent::RemoteStreamReceived { peer, stream });
            }
        }
    }

    /// Swap the shared local stream across every live connection.
    /// In-place replacement leaves established transports untouched; a
    /// genuinely new sender on an offerer connection forces a fresh
    /// offer for that peer.
    async fn set_local_stream(&mut self, stream: Option<MediaStream>) {
        self.publisher.set_stream(stream);

        let targets: Vec<(PeerId, Arc<dyn PeerTransport>, NegotiationRole)> = self
            .registry
            .iter()
            .map(|handle| {
                (
                    handle.remote.clone(),
                    handle.transport.clone(),
                    handle.role,
                )
            })
            .collect();

        let mut renegotiate = Vec::new();
        for (peer, transport, role) in targets {
            match self.publisher.apply_to(transport.as_ref()).await {
                Ok(attachments) => {
                    if role == NegotiationRole::Offerer
                        && attachments.contains(&TrackAttachment::Added)
                    {
                        renegotiate.push(peer);
                    }
                }
                Err(error) => warn!(peer = %peer, "failed to publish tracks: {error}"),
            }
        }

        for peer in renegotiate {
            debug!(peer = %peer, "new sender added, renegotiating");
            self.create_offer(peer).await;
        }
    }

    /// Close everything. Safe to call repeatedly and from a torn-down
    /// state; in-flight negotiation steps complete against closed
    /// transports and their results are discarded.
    async fn cleanup(&mut self) {
        for handle in self.registry.drain() {
            if let Err(error) = handle.transport.close().await {
                debug!(peer = %handle.remote, "error closing transport: {error}");
            }
        }
        self.candidates.clear();
        self.inbound = closed_inbound();
        if let Err(error) = self.relay.close().await {
            debug!("error closing relay subscription: {error}");
        }
        self.state_tx.send_replace(ConnectionState::Idle);
        self.remote_tx.send_replace(None);
    }

    /// Close any superseded connection for `remote` and open a fresh
    /// transport under the next epoch.
    async fn open_transport(
        &mut self,
        remote: &PeerId,
    ) -> Option<(ConnectionId, Arc<dyn PeerTransport>)> {
        if let Some(old) = self.registry.remove(remote) {
            debug!(peer = %remote, "superseding existing connection");
            if let Err(error) = old.transport.close().await {
                debug!(peer = %remote, "error closing superseded transport: {error}");
            }
        }

        self.next_conn += 1;
        let conn = ConnectionId(self.next_conn);
        match self
            .transports
            .create(
                remote.clone(),
                conn,
                &self.transport_config,
                self.transport_tx.clone(),
            )
            .await
        {
            Ok(transport) => Some((conn, transport)),
            Err(error) => {
                self.fail_peer(remote.clone(), error).await;
                None
            }
        }
    }

    /// Apply everything buffered for `peer`, exactly once, in arrival
    /// order.
    async fn drain_candidates(&mut self, peer: &PeerId, transport: &dyn PeerTransport) {
        for candidate in self.candidates.drain(peer) {
            if let Err(error) = transport.add_ice_candidate(candidate).await {
                warn!(peer = %peer, "dropping buffered candidate: {error}");
            }
        }
    }

    /// Force `Failed` for one peer. Never touches any other connection.
    async fn fail_peer(&mut self, peer: PeerId, error: TransportError) {
        warn!(peer = %peer, "negotiation failed: {error}");
        if let Some(handle) = self.registry.remove(&peer) {
            let _ = handle.transport.close().await;
        }
        self.candidates.discard(&peer);
        self.state_tx.send_replace(ConnectionState::Failed);
        let _ = self.event_tx.send(EngineEvent::ConnectionStateChanged {
            peer: peer.clone(),
            state: ConnectionState::Failed,
        });
        let _ = self
            .event_tx
            .send(EngineEvent::NegotiationFailed { peer, error });
    }

    fn publish_state(&mut self, peer: &PeerId, state: ConnectionState) {
        if let Some(handle) = self.registry.get_mut(peer) {
            handle.state = state;
        }
        // The observable lifecycle state mirrors the latest transition.
        self.state_tx.send_replace(state);
        let _ = self.event_tx.send(EngineEvent::ConnectionStateChanged {
            peer: peer.clone(),
            state,
        });
    }

    fn is_current(&self, peer: &PeerId, conn: ConnectionId) -> bool {
        self.registry
            .get(peer)
            .is_some_and(|handle| handle.conn == conn)
    }

    async fn send_signal(&mut self, to: PeerId, body: SignalBody) {
        if let Err(error) = self.relay.send_to(to, body).await {
            warn!("failed to publish signaling message: {error}");
            let _ = self.event_tx.send(EngineEvent::RelayError(error));
        }
    }
}

/// A receiver that yields nothing: stands in for the relay
/// subscription before it opens and after cleanup drops it.
fn closed_inbound() -> mpsc::Receiver<SignalMessage> {
    mpsc::channel(1).1
}
