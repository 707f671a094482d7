//! Reference game: a deterministic headless implementation of [`Game`]

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::arena::{ARENA_LEVEL, LevelDatabase, Objective, Pose, step_pose};
use super::faults::FaultQueue;
use super::network::{LoopbackNetwork, OpponentConfig};
use super::render;
use crate::client::{
    Client, ClientMessage, Entrypoints, FrameError, Game, GameContext, GameState, LobbyPhase,
    LobbyScreen, MpState, Player, RenderFn, ServerMessage, UpdateFn,
};
use crate::constants::*;

/// Something the reference game did, in frame order
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    LevelLoaded { frame: u64, index: usize },
    Fire { frame: u64 },
    RoomEntered { frame: u64, room_code: String },
    MatchStart { frame: u64 },
    MatchEnd { frame: u64, winner_id: String },
}

impl SimEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::LevelLoaded { .. } => "LevelLoaded",
            SimEvent::Fire { .. } => "Fire",
            SimEvent::RoomEntered { .. } => "RoomEntered",
            SimEvent::MatchStart { .. } => "MatchStart",
            SimEvent::MatchEnd { .. } => "MatchEnd",
        }
    }

    pub fn frame(&self) -> u64 {
        match self {
            SimEvent::LevelLoaded { frame, .. }
            | SimEvent::Fire { frame }
            | SimEvent::RoomEntered { frame, .. }
            | SimEvent::MatchStart { frame }
            | SimEvent::MatchEnd { frame, .. } => *frame,
        }
    }
}

/// Game-internal state not exposed through the context
#[derive(Debug, Default)]
struct SimWorld {
    intro_progress: f32,
    weapon_cooldown: f32,
    objective: Option<Objective>,
    events: Vec<SimEvent>,
}

pub struct SimGame {
    levels: Rc<LevelDatabase>,
    network: Rc<LoopbackNetwork>,
    faults: FaultQueue,
    world: Rc<RefCell<SimWorld>>,
}

impl SimGame {
    pub fn new(seed: u64) -> Self {
        Self {
            levels: Rc::new(LevelDatabase::default_levels()),
            network: Rc::new(LoopbackNetwork::new(seed)),
            faults: FaultQueue::default(),
            world: Rc::new(RefCell::new(SimWorld::default())),
        }
    }

    /// Boot a client running this game on its loopback network
    pub fn client(seed: u64) -> (Client, Rc<SimGame>) {
        let game = Rc::new(SimGame::new(seed));
        let client = Client::new(game.clone(), game.network.clone());
        (client, game)
    }

    pub fn network(&self) -> Rc<LoopbackNetwork> {
        self.network.clone()
    }

    pub fn faults(&self) -> &FaultQueue {
        &self.faults
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.world.borrow().events.clone()
    }

    pub fn configure_match(&self, local_spawn: Option<Pose>, opponent: OpponentConfig) {
        self.network.configure_match(local_spawn, opponent);
    }

    /// Put the client straight into a running match, skipping the lobby
    pub fn enter_match(&self, ctx: &mut GameContext) {
        let start = self.network.start_match();
        self.setup_network_handlers(ctx);
        self.handle_message(ctx, start);
    }

    fn record(&self, event: SimEvent) {
        debug!("Sim event: {:?}", event);
        self.world.borrow_mut().events.push(event);
    }
}

impl Game for SimGame {
    fn init(&self, ctx: &mut GameContext) {
        ctx.game_state = GameState::Menu;
        info!("Reference game booted with {} levels", self.levels.len());
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn load_level(&self, ctx: &mut GameContext, index: usize) -> bool {
        let Some(level) = self.levels.get(index) else {
            return false;
        };
        ctx.current_level_index = index;
        ctx.player = Some(Player {
            pos: level.spawn,
            angle: level.spawn_angle,
            health: PLAYER_MAX_HEALTH,
            alive: true,
        });
        if level.multiplayer {
            ctx.mp_assets.map_loaded = true;
            ctx.mp_assets.palette_loaded = true;
        }
        {
            let mut world = self.world.borrow_mut();
            world.intro_progress = 0.0;
            world.objective = level.objective.clone();
        }
        info!("Loaded level {} ({})", index, level.name);
        self.record(SimEvent::LevelLoaded {
            frame: ctx.clock.frame,
            index,
        });
        true
    }

    fn setup_network_handlers(&self, ctx: &mut GameContext) {
        ctx.network_handlers_installed = true;
    }

    fn handle_message(&self, ctx: &mut GameContext, message: ServerMessage) {
        let frame = ctx.clock.frame;
        match message {
            ServerMessage::RoomCreated { room_code } | ServerMessage::RoomJoined { room_code } => {
                let lobby = ctx.lobby.get_or_insert_with(LobbyScreen::default);
                lobby.phase = LobbyPhase::InRoom;
                lobby.room_code = Some(room_code.clone());
                self.record(SimEvent::RoomEntered { frame, room_code });
            }
            ServerMessage::PeerReady => {
                if let Some(lobby) = ctx.lobby.as_mut() {
                    lobby.phase = LobbyPhase::Ready;
                }
            }
            ServerMessage::MatchStart {
                player_id,
                spawn,
                angle,
            } => {
                self.load_level(ctx, ARENA_LEVEL);
                ctx.player = Some(Player {
                    pos: spawn,
                    angle,
                    health: PLAYER_MAX_HEALTH,
                    alive: true,
                });
                ctx.mp = Some(MpState {
                    local_player_id: Some(player_id),
                    ..Default::default()
                });
                ctx.lobby = None;
                ctx.game_state = GameState::MpPlaying;
                self.world.borrow_mut().weapon_cooldown = 0.0;
                self.record(SimEvent::MatchStart { frame });
            }
            ServerMessage::State {
                remote,
                local_tier,
                remote_tier,
                match_time,
                local_health,
            } => {
                let Some(mp) = ctx.mp.as_mut() else {
                    warn!("State update outside a match");
                    return;
                };
                mp.remote_player = remote;
                mp.local_tier = local_tier;
                mp.remote_tier = remote_tier;
                mp.match_time = match_time;
                if let Some(player) = ctx.player.as_mut() {
                    player.health = local_health;
                    player.alive = local_health > 0.0;
                }
            }
            ServerMessage::MatchEnd { winner_id } => {
                if let Some(mp) = ctx.mp.as_mut() {
                    mp.winner_id = Some(winner_id.clone());
                }
                ctx.game_state = GameState::MpResults;
                info!("Match over, winner {}", winner_id);
                self.record(SimEvent::MatchEnd { frame, winner_id });
            }
        }
    }

    fn entrypoints(&self) -> Entrypoints {
        Entrypoints {
            update: campaign_update(self.levels.clone(), self.world.clone(), self.faults.clone()),
            render: campaign_render(self.levels.clone(), self.world.clone(), self.faults.clone()),
            update_multiplayer: match_update(self.world.clone(), self.faults.clone()),
            render_multiplayer: match_render(self.faults.clone()),
        }
    }
}

fn campaign_update(
    levels: Rc<LevelDatabase>,
    world: Rc<RefCell<SimWorld>>,
    faults: FaultQueue,
) -> UpdateFn {
    Box::new(move |ctx, dt| {
        faults.check_update(ctx.clock.frame)?;
        match ctx.game_state {
            GameState::LevelIntro => {
                let total = levels
                    .get(ctx.current_level_index)
                    .map_or(0, |level| level.intro.chars().count());
                let mut world = world.borrow_mut();
                world.intro_progress += INTRO_CHARS_PER_SEC * dt;
                ctx.intro_char_index = (world.intro_progress as usize).min(total);
                if ctx.intro_char_index >= total {
                    ctx.game_state = GameState::Playing;
                }
            }
            GameState::Playing => {
                let (mouse_dx, _) = ctx.input.take_mouse_delta();
                if let Some(player) = ctx.player.as_mut().filter(|p| p.alive) {
                    let pose = step_pose(
                        Pose {
                            pos: player.pos,
                            angle: player.angle,
                        },
                        &ctx.input.keys_down,
                        mouse_dx,
                        dt,
                    );
                    player.pos = pose.pos;
                    player.angle = pose.angle;
                }
            }
            GameState::Lobby => {
                ctx.lobby.get_or_insert_with(LobbyScreen::default);
            }
            _ => {}
        }
        Ok(())
    })
}

fn match_update(world: Rc<RefCell<SimWorld>>, faults: FaultQueue) -> UpdateFn {
    Box::new(move |ctx, dt| {
        let frame = ctx.clock.frame;
        faults.check_update(frame)?;
        if ctx.game_state != GameState::MpPlaying {
            return Ok(());
        }
        let (mouse_dx, mouse_dy) = ctx.input.take_mouse_delta();
        let fire = ctx.input.mouse_down;
        let Some(player) = ctx.player.as_mut().filter(|p| p.alive) else {
            return Ok(());
        };
        let pose = step_pose(
            Pose {
                pos: player.pos,
                angle: player.angle,
            },
            &ctx.input.keys_down,
            mouse_dx,
            dt,
        );
        player.pos = pose.pos;
        player.angle = pose.angle;

        {
            let mut world = world.borrow_mut();
            world.weapon_cooldown = (world.weapon_cooldown - dt).max(0.0);
            if fire && world.weapon_cooldown <= 0.0 {
                world.weapon_cooldown = WEAPON_COOLDOWN;
                world.events.push(SimEvent::Fire { frame });
            }
        }

        let message = ClientMessage::Input {
            keys: ctx.input.keys(),
            mouse_dx,
            mouse_dy,
            fire,
            dt,
        };
        ctx.network
            .send(message)
            .map_err(|err| FrameError::new(format!("input send failed: {}", err)))
    })
}

fn campaign_render(
    levels: Rc<LevelDatabase>,
    world: Rc<RefCell<SimWorld>>,
    faults: FaultQueue,
) -> RenderFn {
    Box::new(move |ctx| {
        let frame = ctx.clock.frame;
        let state = ctx.game_state;
        let buffer = &mut ctx.display.buffer;
        render::clear(buffer, render::background(state));
        match state {
            GameState::LevelIntro => {
                let total = levels
                    .get(ctx.current_level_index)
                    .map_or(0, |level| level.intro.chars().count());
                render::draw_intro_progress(buffer, ctx.intro_char_index, total);
            }
            GameState::Playing => {
                if let Some(player) = ctx.player.as_ref() {
                    render::draw_player(buffer, player.pos, player.angle, player.alive);
                    render::draw_health_bar(buffer, player.health);
                }
                let world = world.borrow();
                if world.objective.is_some() && !ctx.hud.hide_objectives {
                    render::draw_objective_counter(buffer, world.objective.as_ref())?;
                }
            }
            _ => {}
        }
        buffer.put_pixel(0, 0, render::heartbeat_color(frame));
        faults.check_render(frame)
    })
}

fn match_render(faults: FaultQueue) -> RenderFn {
    Box::new(move |ctx| {
        let frame = ctx.clock.frame;
        let buffer = &mut ctx.display.buffer;
        render::clear(buffer, render::background(ctx.game_state));
        if let Some(rp) = ctx.mp.as_ref().and_then(|mp| mp.remote_player.as_ref()) {
            if let Some(pos) = rp.pos {
                render::draw_remote(buffer, pos, rp.alive);
            }
        }
        if let Some(player) = ctx.player.as_ref() {
            render::draw_player(buffer, player.pos, player.angle, player.alive);
            render::draw_health_bar(buffer, player.health);
        }
        // The multiplayer HUD gets an empty objective state
        if !ctx.hud.hide_objectives {
            render::draw_objective_counter(buffer, None)?;
        }
        buffer.put_pixel(0, 0, render::heartbeat_color(frame));
        faults.check_render(frame)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Vec2;

    #[test]
    fn test_intro_advances_into_playing() {
        let (mut client, game) = SimGame::client(1);
        client.start().unwrap();
        {
            let ctx = client.context();
            let mut ctx = ctx.borrow_mut();
            assert!(game.load_level(&mut ctx, 0));
            ctx.game_state = GameState::LevelIntro;
        }
        client.step();
        assert_eq!(client.context().borrow().game_state, GameState::LevelIntro);
        assert!(client.context().borrow().intro_char_index <= 1);
        // 34 characters at 40/s with 1/60 s frames
        for _ in 0..70 {
            client.step();
        }
        assert_eq!(client.context().borrow().game_state, GameState::Playing);
    }

    #[test]
    fn test_multiplayer_update_sends_input_every_frame() {
        let (mut client, game) = SimGame::client(1);
        client.start().unwrap();
        game.enter_match(&mut client.context().borrow_mut());
        client.context().borrow_mut().hud.hide_objectives = true;
        for _ in 0..5 {
            client.step();
        }
        let inputs = game
            .network()
            .sent()
            .into_iter()
            .filter(|m| m.kind() == "input")
            .count();
        assert_eq!(inputs, 5);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let (mut client, game) = SimGame::client(1);
        client.start().unwrap();
        game.enter_match(&mut client.context().borrow_mut());
        {
            let ctx = client.context();
            let mut ctx = ctx.borrow_mut();
            ctx.hud.hide_objectives = true;
            ctx.input.mouse_down = true;
        }
        // 0.25 s cooldown at 60 fps: three shots in 40 frames
        for _ in 0..40 {
            client.step();
        }
        let fires: Vec<u64> = game
            .events()
            .iter()
            .filter(|e| e.kind() == "Fire")
            .map(SimEvent::frame)
            .collect();
        assert_eq!(fires.len(), 3);
        assert_eq!(fires[0], 1);
        assert!(fires.windows(2).all(|w| w[1] - w[0] >= 15));
    }

    #[test]
    fn test_match_start_enters_arena() {
        let (client, game) = SimGame::client(1);
        let ctx = client.context();
        game.enter_match(&mut ctx.borrow_mut());
        let ctx = ctx.borrow();
        assert_eq!(ctx.game_state, GameState::MpPlaying);
        assert_eq!(ctx.current_level_index, ARENA_LEVEL);
        assert!(ctx.mp_assets.map_loaded && ctx.mp_assets.palette_loaded);
        assert!(ctx.mp.as_ref().unwrap().local_player_id.is_some());
        assert_eq!(ctx.player.as_ref().unwrap().pos, Vec2::new(3.0, 2.0));
    }
}
