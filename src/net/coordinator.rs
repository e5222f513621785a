//! Session coordinator - owns the local identity, the role, the world,
//! and the set of open links; runs the tick loop and the message handlers.
//!
//! All state mutation happens in short synchronous handlers behind one
//! `Arc<RwLock<Session>>`, invoked from the tick task and per-connection
//! read tasks. Input application is not ordered against the tick: a
//! heading update lands before or after the current tick's read, and
//! either is correct since input is "whatever angle is current".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use wtransport::endpoint::IncomingSession;
use wtransport::SendStream;

use crate::commentary::{events, CommentaryClient};
use crate::game::constants::{food, world};
use crate::game::simulation::{self, TickEvent};
use crate::game::state::{GameState, GameStatus, PeerId, Player};
use crate::net::protocol::{decode, encode, Envelope, NetworkMessage, PROTOCOL_VERSION};
use crate::net::transport::{self, GuestEndpoint, HostEndpoint};

/// Which side of the authority split this peer plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// Notifications surfaced to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The local view of the world changed
    StateChanged(GameState),
    /// A commentary line arrived; display timing is the caller's concern
    Commentary(String),
}

/// One open connection's writer, keyed by the remote transport identity.
/// `None` marks a writer whose stream is gone; broadcasts skip it silently.
pub struct PeerLink {
    pub remote_id: PeerId,
    pub writer: Arc<RwLock<Option<SendStream>>>,
}

/// Session state for one peer. Exactly one exists per process; it is
/// passed by `Arc` into the tick driver and the connection handlers
/// rather than living in any global.
pub struct Session {
    local_id: PeerId,
    role: Role,
    pub game: GameState,
    pub links: HashMap<PeerId, PeerLink>,
    /// Set on guests once the host link is up
    pub host_id: Option<PeerId>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Session {
    pub fn new(local_id: PeerId, role: Role, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            local_id,
            role,
            game: GameState::new(),
            links: HashMap::new(),
            host_id: None,
            events,
        }
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Start the hosting session: seed the world, switch to playing, and
    /// register the host's own player through the same join path guests
    /// take.
    pub fn start_hosting(&mut self, name: String, color: String, rng: &mut impl Rng) {
        self.game.status = GameStatus::Playing;
        while self.game.foods.len() < food::TARGET_COUNT {
            self.game.spawn_food(rng);
        }
        self.handle_join(self.local_id, name, color, rng);
    }

    /// Register a new player at a random valid spawn. Re-joining under an
    /// existing identity replaces that player, matching a fresh start.
    pub fn handle_join(&mut self, peer: PeerId, name: String, color: String, rng: &mut impl Rng) {
        let (position, angle) = simulation::random_spawn(&self.game, rng);
        info!("Player '{}' ({}) joined", name, peer);
        self.game
            .add_player(Player::spawn(peer, name, color, position, angle));
    }

    /// Overwrite a player's stored heading. Unknown senders are ignored.
    pub fn handle_input(&mut self, peer: PeerId, angle: f32) {
        if let Some(player) = self.game.get_player_mut(peer) {
            player.angle = angle;
        }
    }

    /// Guest side: wholesale-replace the local world with the received
    /// authoritative snapshot. Guests never simulate locally.
    pub fn apply_snapshot(&mut self, state: GameState) {
        self.game = state;
        self.notify_state();
    }

    pub fn register_link(&mut self, remote_id: PeerId, writer: Arc<RwLock<Option<SendStream>>>) {
        self.links.insert(remote_id, PeerLink { remote_id, writer });
    }

    /// Forget a link whose stream is gone. The player stays in the world,
    /// frozen on its last heading.
    pub fn clear_link(&mut self, remote_id: PeerId) {
        self.links.remove(&remote_id);
    }

    fn notify_state(&self) {
        let _ = self
            .events
            .send(SessionEvent::StateChanged(self.game.clone()));
    }

    pub fn surface_commentary(&self, text: String) {
        let _ = self.events.send(SessionEvent::Commentary(text));
    }
}

/// Start the fixed-rate simulation loop (host only). Each tick advances
/// the world, surfaces the new state locally, broadcasts it to every open
/// link, and fires commentary for deaths.
pub fn spawn_tick_loop(session: Arc<RwLock<Session>>, commentary: Arc<CommentaryClient>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(world::TICK_DURATION_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Simulation loop started at {} Hz", world::TICK_RATE);

        loop {
            ticker.tick().await;

            let tick = {
                let mut s = session.write().await;
                if s.game.status != GameStatus::Playing {
                    None
                } else {
                    let tick_events = simulation::advance(&mut s.game, &mut rand::thread_rng());
                    s.notify_state();

                    let deaths: Vec<(&'static str, String, u32)> = tick_events
                        .iter()
                        .filter_map(|event| match event {
                            TickEvent::HitWall { player } => s
                                .game
                                .get_player(*player)
                                .map(|p| (events::HIT_WALL, p.name.clone(), p.score)),
                            TickEvent::Collision { player } => s
                                .game
                                .get_player(*player)
                                .map(|p| (events::COLLISION, p.name.clone(), p.score)),
                            TickEvent::AteFood { .. } => None,
                        })
                        .collect();

                    Some((s.game.clone(), deaths))
                }
            };

            let Some((snapshot, deaths)) = tick else {
                continue;
            };

            broadcast(&session, NetworkMessage::StateUpdate { state: snapshot }).await;

            for (label, name, score) in deaths {
                spawn_commentary(session.clone(), commentary.clone(), label, name, score);
            }
        }
    });
}

/// Send a message to every link whose writer is still open. Writes are
/// spawned per link, so a dead or slow connection never blocks or fails
/// delivery to the others.
pub async fn broadcast(session: &Arc<RwLock<Session>>, message: NetworkMessage) {
    let encoded = match encode(&Envelope::new(message)) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to encode message for broadcast: {}", e);
            return;
        }
    };

    let writers: Vec<(PeerId, Arc<RwLock<Option<SendStream>>>)> = {
        let s = session.read().await;
        s.links
            .values()
            .map(|link| (link.remote_id, link.writer.clone()))
            .collect()
    };

    for (peer, writer) in writers {
        let encoded = encoded.clone();
        tokio::spawn(async move {
            let mut guard = writer.write().await;
            if let Some(stream) = guard.as_mut() {
                if let Err(e) = transport::write_frame(stream, &encoded).await {
                    debug!("Broadcast to {}: {e:#}", peer);
                }
            }
        });
    }
}

/// Single entry point for locally captured input. The host applies its
/// own heading through the same handler guests go through; a guest relays
/// it to the host, or drops it silently when the link is down.
pub async fn send_input(session: &Arc<RwLock<Session>>, angle: f32) {
    let (role, local_id, host_writer) = {
        let s = session.read().await;
        let writer = s
            .host_id
            .and_then(|host| s.links.get(&host))
            .map(|link| link.writer.clone());
        (s.role, s.local_id, writer)
    };

    match role {
        Role::Host => session.write().await.handle_input(local_id, angle),
        Role::Guest => {
            let Some(writer) = host_writer else { return };
            let Ok(encoded) = encode(&Envelope::new(NetworkMessage::InputUpdate { angle })) else {
                return;
            };
            let mut guard = writer.write().await;
            if let Some(stream) = guard.as_mut() {
                let _ = transport::write_frame(stream, &encoded).await;
            }
        }
    }
}

/// Fire-and-forget commentary: fetch a line off the tick path, then
/// broadcast it and surface it locally. A stale line arriving after a
/// newer event still gets shown; it is cosmetic only.
pub fn spawn_commentary(
    session: Arc<RwLock<Session>>,
    client: Arc<CommentaryClient>,
    event: &'static str,
    player_name: String,
    score: u32,
) {
    tokio::spawn(async move {
        let text = client.commentary(event, &player_name, score).await;
        broadcast(&session, NetworkMessage::AiComment { text: text.clone() }).await;
        session.read().await.surface_commentary(text);
    });
}

/// Host main loop: accept inbound connections for the life of the session.
pub async fn run_host(
    session: Arc<RwLock<Session>>,
    endpoint: HostEndpoint,
    commentary: Arc<CommentaryClient>,
) -> anyhow::Result<()> {
    spawn_tick_loop(session.clone(), commentary.clone());

    let local_id = endpoint.local_id;
    loop {
        let incoming = endpoint.accept().await;
        let session = session.clone();
        let commentary = commentary.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_guest_connection(session, commentary, local_id, incoming).await {
                warn!("Connection error: {e:#}");
            }
        });
    }
}

/// Drive one guest connection: identity preamble, link registration, then
/// the inbound message loop until the stream closes.
async fn handle_guest_connection(
    session: Arc<RwLock<Session>>,
    commentary: Arc<CommentaryClient>,
    local_id: PeerId,
    incoming: IncomingSession,
) -> anyhow::Result<()> {
    let request = incoming.await?;
    debug!("New connection from {:?}", request.authority());
    let connection = request.accept().await?;
    let (mut send, mut recv) = connection.accept_bi().await?;
    let remote_id = transport::exchange_identity(&mut send, &mut recv, local_id).await?;
    info!("Peer {} connected", remote_id);

    let writer = Arc::new(RwLock::new(Some(send)));
    session.write().await.register_link(remote_id, writer);

    let mut buffer = vec![0u8; 4096];
    loop {
        let len = match transport::read_frame(&mut recv, &mut buffer).await {
            Ok(Some(len)) => len,
            Ok(None) => break,
            Err(e) => {
                debug!("Stream read error from {}: {e:#}", remote_id);
                break;
            }
        };

        let envelope: Envelope = match decode(&buffer[..len]) {
            Ok(env) => env,
            Err(e) => {
                warn!("Failed to decode message from {}: {}", remote_id, e);
                continue;
            }
        };
        if envelope.version != PROTOCOL_VERSION {
            debug!(
                "Ignoring schema version {} message from {}",
                envelope.version, remote_id
            );
            continue;
        }

        match envelope.msg {
            NetworkMessage::JoinRequest { name, color } => {
                {
                    let mut s = session.write().await;
                    let mut rng = rand::thread_rng();
                    s.handle_join(remote_id, name.clone(), color, &mut rng);
                }
                spawn_commentary(
                    session.clone(),
                    commentary.clone(),
                    events::NEW_HIRE,
                    name,
                    0,
                );
            }
            NetworkMessage::InputUpdate { angle } => {
                session.write().await.handle_input(remote_id, angle);
            }
            NetworkMessage::StateUpdate { .. } | NetworkMessage::AiComment { .. } => {
                debug!("Ignoring host-bound message from {}", remote_id);
            }
            // Reserved variant, not wired to any handler
            NetworkMessage::ChatMessage { .. } => {}
        }
    }

    // The player stays in the world; only the link goes away.
    session.write().await.clear_link(remote_id);
    info!("Peer {} disconnected", remote_id);
    Ok(())
}

/// Guest main loop: connect to the host's room code, join, then apply
/// snapshots until the connection goes away.
pub async fn run_guest(
    session: Arc<RwLock<Session>>,
    endpoint: GuestEndpoint,
    room_code: String,
    name: String,
    color: String,
) -> anyhow::Result<()> {
    let connection = endpoint.connect(&room_code).await?;
    let (mut send, mut recv) = connection.open_bi().await?.await?;
    let remote_id = transport::exchange_identity(&mut send, &mut recv, endpoint.local_id).await?;
    info!("Connected to host {}", remote_id);

    let writer = Arc::new(RwLock::new(Some(send)));
    {
        let mut s = session.write().await;
        s.register_link(remote_id, writer.clone());
        s.host_id = Some(remote_id);
    }

    // Introduce ourselves; everything else arrives as snapshots
    let join = encode(&Envelope::new(NetworkMessage::JoinRequest { name, color }))?;
    {
        let mut guard = writer.write().await;
        if let Some(stream) = guard.as_mut() {
            transport::write_frame(stream, &join).await?;
        }
    }

    let mut buffer = vec![0u8; 65536];
    loop {
        let len = match transport::read_frame(&mut recv, &mut buffer).await {
            Ok(Some(len)) => len,
            Ok(None) => break,
            Err(e) => {
                debug!("Stream read error: {e:#}");
                break;
            }
        };

        let envelope: Envelope = match decode(&buffer[..len]) {
            Ok(env) => env,
            Err(e) => {
                warn!("Failed to decode message: {}", e);
                continue;
            }
        };
        if envelope.version != PROTOCOL_VERSION {
            debug!("Ignoring schema version {} message", envelope.version);
            continue;
        }

        match envelope.msg {
            NetworkMessage::StateUpdate { state } => {
                session.write().await.apply_snapshot(state);
            }
            NetworkMessage::AiComment { text } => {
                session.read().await.surface_commentary(text);
            }
            NetworkMessage::JoinRequest { .. } | NetworkMessage::InputUpdate { .. } => {
                debug!("Ignoring guest-bound message");
            }
            // Reserved variant, not wired to any handler
            NetworkMessage::ChatMessage { .. } => {}
        }
    }

    session.write().await.clear_link(remote_id);
    warn!("Connection to host lost");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommentaryConfig;
    use crate::game::constants::snake;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn test_session(role: Role) -> (Session, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(Uuid::new_v4(), role, tx), rx)
    }

    #[test]
    fn test_join_adds_exactly_one_player() {
        let (mut session, _rx) = test_session(Role::Host);
        let mut rng = StdRng::seed_from_u64(21);
        let guest = Uuid::new_v4();

        session.handle_join(guest, "Stanley".to_string(), "#8b5cf6".to_string(), &mut rng);

        assert_eq!(session.game.players.len(), 1);
        let player = session.game.get_player(guest).unwrap();
        assert_eq!(player.score, 0);
        assert!(!player.dead);
        assert_eq!(player.segments.len(), snake::INITIAL_LENGTH);
        assert!(session.game.in_bounds(player.head()));
    }

    #[test]
    fn test_start_hosting_registers_host_as_player() {
        let (mut session, _rx) = test_session(Role::Host);
        let mut rng = StdRng::seed_from_u64(22);

        session.start_hosting("Boss".to_string(), "#3b82f6".to_string(), &mut rng);

        assert_eq!(session.game.status, GameStatus::Playing);
        assert_eq!(session.game.foods.len(), food::TARGET_COUNT);
        let host_player = session.game.get_player(session.local_id()).unwrap();
        assert_eq!(host_player.name, "Boss");
    }

    #[test]
    fn test_input_overwrites_angle() {
        let (mut session, _rx) = test_session(Role::Host);
        let mut rng = StdRng::seed_from_u64(23);
        session.start_hosting("Boss".to_string(), "#3b82f6".to_string(), &mut rng);

        session.handle_input(session.local_id(), 2.5);
        let player = session.game.get_player(session.local_id()).unwrap();
        assert!((player.angle - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_input_from_unknown_peer_ignored() {
        let (mut session, _rx) = test_session(Role::Host);
        session.handle_input(Uuid::new_v4(), 1.0);
        assert!(session.game.players.is_empty());
    }

    #[test]
    fn test_apply_snapshot_replaces_wholesale() {
        let (mut session, mut rx) = test_session(Role::Guest);
        let mut rng = StdRng::seed_from_u64(24);

        let mut incoming = GameState::new();
        incoming.status = GameStatus::Playing;
        let remote = Uuid::new_v4();
        incoming.add_player(Player::spawn(
            remote,
            "Angela".to_string(),
            "#ec4899".to_string(),
            crate::util::vec2::Vec2::new(400.0, 400.0),
            1.0,
        ));
        for _ in 0..3 {
            incoming.spawn_food(&mut rng);
        }

        session.apply_snapshot(incoming);

        assert_eq!(session.game.players.len(), 1);
        assert!(session.game.get_player(remote).is_some());
        match rx.try_recv().unwrap() {
            SessionEvent::StateChanged(state) => {
                assert_eq!(state.players.len(), 1);
                assert_eq!(state.foods.len(), 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_links() {
        let (session, _rx) = test_session(Role::Host);
        let session = Arc::new(RwLock::new(session));
        {
            let mut s = session.write().await;
            s.register_link(Uuid::new_v4(), Arc::new(RwLock::new(None)));
            s.register_link(Uuid::new_v4(), Arc::new(RwLock::new(None)));
        }

        // Both writers are gone; the broadcast must complete quietly
        broadcast(
            &session,
            NetworkMessage::AiComment {
                text: "test".to_string(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_guest_input_dropped_without_link() {
        let (session, _rx) = test_session(Role::Guest);
        let session = Arc::new(RwLock::new(session));

        // No host link yet: the input is silently dropped
        send_input(&session, 1.0).await;
    }

    /// Full loopback round trip: a guest joins a live host over real
    /// WebTransport, sees itself in a snapshot, steers, and observes the
    /// authoritative angle change.
    #[tokio::test]
    async fn test_join_and_input_over_loopback() {
        let host_endpoint = HostEndpoint::bind(0).await;
        let port = host_endpoint.local_port().expect("bound port");

        let (host_tx, _host_rx) = mpsc::unbounded_channel();
        let session = Arc::new(RwLock::new(Session::new(
            host_endpoint.local_id,
            Role::Host,
            host_tx,
        )));
        {
            let mut s = session.write().await;
            s.start_hosting(
                "Boss".to_string(),
                "#3b82f6".to_string(),
                &mut rand::thread_rng(),
            );
            // A long-gone link must not disturb delivery to live guests
            s.register_link(Uuid::new_v4(), Arc::new(RwLock::new(None)));
        }
        let commentary = Arc::new(CommentaryClient::new(CommentaryConfig::default()));
        tokio::spawn(run_host(session.clone(), host_endpoint, commentary));

        let guest_endpoint = GuestEndpoint::bind().await;
        let guest_id = guest_endpoint.local_id;
        let (guest_tx, mut guest_rx) = mpsc::unbounded_channel();
        let guest_session = Arc::new(RwLock::new(Session::new(guest_id, Role::Guest, guest_tx)));
        tokio::spawn(run_guest(
            guest_session.clone(),
            guest_endpoint,
            format!("https://127.0.0.1:{}", port),
            "Jim".to_string(),
            "#ef4444".to_string(),
        ));

        // Wait until a snapshot shows both players
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match guest_rx.recv().await {
                    Some(SessionEvent::StateChanged(state)) if state.players.len() == 2 => break,
                    Some(_) => {}
                    None => panic!("guest event channel closed"),
                }
            }
        })
        .await
        .expect("guest never saw both players");

        // Steer and wait for the authoritative state to reflect it
        send_input(&guest_session, 2.5).await;
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match guest_rx.recv().await {
                    Some(SessionEvent::StateChanged(state)) => {
                        if let Some(me) = state.get_player(guest_id) {
                            if (me.angle - 2.5).abs() < 1e-6 {
                                break;
                            }
                        }
                    }
                    Some(_) => {}
                    None => panic!("guest event channel closed"),
                }
            }
        })
        .await
        .expect("input never reached the authoritative state");
    }
}
