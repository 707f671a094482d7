//! Loopback network: an in-process stand-in for the multiplayer server
//!
//! The handshake completes on the first frame poll after `connect`, so a
//! suspended `hostGame()` resumes only once the frame loop has advanced.
//! The server side runs a scripted opponent and resolves hits from the
//! input messages the client sends.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::arena::{Pose, clamp_to_arena, shot_hits, step_pose};
use crate::client::{
    ClientMessage, Handshake, KeyCode, NetworkError, NetworkManager, RemotePlayerSnapshot, ServerMessage,
};
use crate::constants::*;
use crate::helpers::Vec2;

/// How the scripted opponent moves
#[derive(Clone, Debug, PartialEq)]
pub enum OpponentScript {
    Stationary,
    /// Walk back and forth between the spawn and `to`
    Patrol { to: Vec2 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OpponentConfig {
    pub spawn: Vec2,
    pub script: OpponentScript,
    pub health: f32,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            spawn: OPPONENT_SPAWN.into(),
            script: OpponentScript::Stationary,
            health: PLAYER_MAX_HEALTH,
        }
    }
}

/// Server-side match state
#[derive(Debug)]
struct ServerMatch {
    local_id: String,
    local: Pose,
    local_health: f32,
    remote_pos: Vec2,
    remote_health: f32,
    remote_alive: bool,
    respawn_timer: f32,
    patrol_outbound: bool,
    local_tier: i32,
    remote_tier: i32,
    match_time: f32,
    cooldown: f32,
    ended: bool,
}

#[derive(Debug)]
struct LoopbackState {
    rng: StdRng,
    connecting: bool,
    connect_calls: u32,
    sent: Vec<ClientMessage>,
    unprocessed: VecDeque<ClientMessage>,
    inbox: VecDeque<ServerMessage>,
    room_code: Option<String>,
    local_spawn: Option<Pose>,
    opponent: OpponentConfig,
    current: Option<ServerMatch>,
    hits: u32,
}

pub struct LoopbackNetwork {
    state: RefCell<LoopbackState>,
    connected: watch::Sender<bool>,
}

impl LoopbackNetwork {
    pub fn new(seed: u64) -> Self {
        let (connected, _) = watch::channel(false);
        Self {
            state: RefCell::new(LoopbackState {
                rng: StdRng::seed_from_u64(seed),
                connecting: false,
                connect_calls: 0,
                sent: Vec::new(),
                unprocessed: VecDeque::new(),
                inbox: VecDeque::new(),
                room_code: None,
                local_spawn: None,
                opponent: OpponentConfig::default(),
                current: None,
                hits: 0,
            }),
            connected,
        }
    }

    /// Override spawn placement for the next match
    pub fn configure_match(&self, local_spawn: Option<Pose>, opponent: OpponentConfig) {
        let mut state = self.state.borrow_mut();
        state.local_spawn = local_spawn;
        state.opponent = opponent;
    }

    /// Skip the handshake and the lobby, returning the match start message
    pub fn start_match(&self) -> ServerMessage {
        self.connected.send_replace(true);
        let mut state = self.state.borrow_mut();
        state.connecting = false;
        state.begin_match()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.state.borrow().sent.clone()
    }

    /// Wire `type` of every sent message, inputs excluded
    pub fn sent_kinds(&self) -> Vec<&'static str> {
        self.state
            .borrow()
            .sent
            .iter()
            .map(ClientMessage::kind)
            .filter(|kind| *kind != "input")
            .collect()
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.borrow().connect_calls
    }

    pub fn room_code(&self) -> Option<String> {
        self.state.borrow().room_code.clone()
    }

    /// Shots the server resolved as hits
    pub fn hits(&self) -> u32 {
        self.state.borrow().hits
    }
}

impl NetworkManager for LoopbackNetwork {
    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn connect(&self) -> Handshake {
        let mut connected = self.connected.subscribe();
        {
            let mut state = self.state.borrow_mut();
            state.connect_calls += 1;
            if !*connected.borrow() {
                state.connecting = true;
                debug!("Loopback handshake started");
            }
        }
        Box::pin(async move {
            connected
                .wait_for(|up| *up)
                .await
                .map(|_| ())
                .map_err(|_| NetworkError::Closed)
        })
    }

    fn send(&self, message: ClientMessage) -> Result<(), NetworkError> {
        if !self.is_connected() {
            return Err(NetworkError::NotConnected);
        }
        let mut state = self.state.borrow_mut();
        state.sent.push(message.clone());
        state.unprocessed.push_back(message);
        Ok(())
    }

    fn poll(&self) -> Vec<ServerMessage> {
        let mut state = self.state.borrow_mut();
        if state.connecting {
            state.connecting = false;
            self.connected.send_replace(true);
            info!("Loopback handshake complete");
        }
        while let Some(message) = state.unprocessed.pop_front() {
            state.process(message);
        }
        state.report();
        state.inbox.drain(..).collect()
    }
}

impl LoopbackState {
    fn generate_room_code(&mut self) -> String {
        (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[self.rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect()
    }

    fn begin_match(&mut self) -> ServerMessage {
        let local = self.local_spawn.unwrap_or(Pose {
            pos: Vec2::new(3.0, 2.0),
            angle: 0.0,
        });
        let local_id = Uuid::new_v4().to_string();
        self.current = Some(ServerMatch {
            local_id: local_id.clone(),
            local,
            local_health: PLAYER_MAX_HEALTH,
            remote_pos: self.opponent.spawn,
            remote_health: self.opponent.health,
            remote_alive: self.opponent.health > 0.0,
            respawn_timer: 0.0,
            patrol_outbound: true,
            local_tier: 0,
            remote_tier: 0,
            match_time: 0.0,
            cooldown: 0.0,
            ended: false,
        });
        info!("Loopback match started for {}", local_id);
        ServerMessage::MatchStart {
            player_id: local_id,
            spawn: local.pos,
            angle: local.angle,
        }
    }

    fn process(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom => {
                let room_code = self.generate_room_code();
                self.room_code = Some(room_code.clone());
                self.inbox.push_back(ServerMessage::RoomCreated { room_code });
            }
            ClientMessage::JoinRoom { room_code } => {
                self.room_code = Some(room_code.clone());
                self.inbox.push_back(ServerMessage::RoomJoined { room_code });
            }
            ClientMessage::Ready => {
                // The scripted peer is always ready
                self.inbox.push_back(ServerMessage::PeerReady);
                let start = self.begin_match();
                self.inbox.push_back(start);
            }
            ClientMessage::Input {
                keys,
                mouse_dx,
                fire,
                dt,
                ..
            } => {
                let keys: BTreeSet<_> = keys.into_iter().collect();
                self.apply_input(&keys, mouse_dx, fire, dt);
            }
        }
    }

    fn apply_input(&mut self, keys: &BTreeSet<KeyCode>, mouse_dx: f32, fire: bool, dt: f32) {
        let opponent = self.opponent.clone();
        let Some(m) = self.current.as_mut().filter(|m| !m.ended) else {
            return;
        };
        m.match_time += dt;
        m.local = step_pose(m.local, keys, mouse_dx, dt);
        m.cooldown = (m.cooldown - dt).max(0.0);

        if !m.remote_alive {
            m.respawn_timer -= dt;
            if m.respawn_timer <= 0.0 {
                m.remote_alive = true;
                m.remote_health = opponent.health;
                m.remote_pos = opponent.spawn;
                m.patrol_outbound = true;
            }
        } else if let OpponentScript::Patrol { to } = opponent.script {
            let goal = if m.patrol_outbound { to } else { opponent.spawn };
            let dist = m.remote_pos.distance(goal);
            let step = OPPONENT_PATROL_SPEED * dt;
            if dist <= step {
                m.remote_pos = goal;
                m.patrol_outbound = !m.patrol_outbound;
            } else {
                m.remote_pos.x += (goal.x - m.remote_pos.x) / dist * step;
                m.remote_pos.y += (goal.y - m.remote_pos.y) / dist * step;
                m.remote_pos = clamp_to_arena(m.remote_pos);
            }
        }

        if fire && m.cooldown <= 0.0 {
            m.cooldown = WEAPON_COOLDOWN;
            if m.remote_alive && shot_hits(m.local, m.remote_pos) {
                self.hits += 1;
                m.remote_health -= WEAPON_DAMAGE;
                debug!("Hit: opponent at {:.0} hp", m.remote_health);
                if m.remote_health <= 0.0 {
                    m.remote_alive = false;
                    m.remote_health = 0.0;
                    m.respawn_timer = RESPAWN_TIME;
                    m.local_tier += 1;
                    info!("Opponent down, local tier {}", m.local_tier);
                    if m.local_tier >= MATCH_WIN_TIER {
                        m.ended = true;
                        self.inbox.push_back(ServerMessage::MatchEnd {
                            winner_id: m.local_id.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Per-poll state report while a match is on
    fn report(&mut self) {
        let Some(m) = self.current.as_ref().filter(|m| !m.ended) else {
            return;
        };
        self.inbox.push_back(ServerMessage::State {
            remote: Some(RemotePlayerSnapshot {
                pos: Some(m.remote_pos),
                alive: m.remote_alive,
                health: m.remote_health,
            }),
            local_tier: m.local_tier,
            remote_tier: m.remote_tier,
            match_time: m.match_time,
            local_health: m.local_health,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[test]
    fn test_send_requires_connection() {
        let network = LoopbackNetwork::new(1);
        assert_eq!(network.send(ClientMessage::Ready), Err(NetworkError::NotConnected));
    }

    #[tokio::test]
    async fn test_handshake_completes_on_next_poll() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let network = std::rc::Rc::new(LoopbackNetwork::new(1));
                let handshake = tokio::task::spawn_local(network.connect());
                tokio::task::yield_now().await;
                assert!(!handshake.is_finished());
                assert!(!network.is_connected());
                network.poll();
                assert!(network.is_connected());
                handshake.await.unwrap().unwrap();
                // Already connected: resolves without a poll
                network.connect().await.unwrap();
                assert_eq!(network.connect_calls(), 2);
            })
            .await;
    }

    #[test]
    fn test_room_codes_are_seeded() {
        let codes: Vec<String> = (0..2)
            .map(|_| {
                let network = LoopbackNetwork::new(42);
                network.start_match();
                network.send(ClientMessage::CreateRoom).unwrap();
                network.poll();
                network.room_code().unwrap()
            })
            .collect();
        assert_eq!(codes[0], codes[1]);
        assert_eq!(codes[0].len(), ROOM_CODE_LEN);
        assert!(codes[0].bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_ready_starts_match_and_reports_state() {
        let network = LoopbackNetwork::new(1);
        network.start_match();
        network.send(ClientMessage::Ready).unwrap();
        let inbound = network.poll();
        assert_eq!(inbound[0], ServerMessage::PeerReady);
        assert!(matches!(inbound[1], ServerMessage::MatchStart { .. }));
        assert!(matches!(inbound[2], ServerMessage::State { .. }));
    }

    #[test]
    fn test_shots_resolve_against_opponent() {
        let network = LoopbackNetwork::new(1);
        network.configure_match(
            Some(Pose {
                pos: Vec2::new(16.0, 10.0),
                angle: std::f32::consts::FRAC_PI_2,
            }),
            OpponentConfig {
                spawn: Vec2::new(16.0, 20.0),
                health: 20.0,
                ..Default::default()
            },
        );
        network.start_match();
        let shot = || ClientMessage::Input {
            keys: vec![],
            mouse_dx: 0.0,
            mouse_dy: 0.0,
            fire: true,
            dt: WEAPON_COOLDOWN,
        };
        network.send(shot()).unwrap();
        network.send(shot()).unwrap();
        let inbound = network.poll();
        assert_eq!(network.hits(), 2);
        match inbound.last() {
            Some(ServerMessage::State { remote, local_tier, .. }) => {
                assert_eq!(*local_tier, 1);
                assert!(!remote.as_ref().unwrap().alive);
            }
            other => panic!("expected state, got {:?}", other),
        }
    }
}
