//! Application context: every piece of client state the game and the
//! instrumentation share, held in one place instead of ambient globals.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use super::display::Display;
use super::input::InputState;
use super::network::{NetworkManager, RemotePlayerSnapshot};
use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_DT, MAX_FRAME_DT};
use crate::helpers::Vec2;

/// Shared handle to the context (single-threaded, frame-serialized)
pub type SharedContext = Rc<RefCell<GameContext>>;

/// Readiness of the context, consulted before dereferencing dependent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Script still evaluating; game symbols do not exist yet
    Uninitialized,
    /// Game objects exist, loop not yet started
    Initialized,
    /// Frame loop scheduled
    Running,
}

impl Lifecycle {
    pub fn is_initialized(self) -> bool {
        self >= Lifecycle::Initialized
    }

    pub fn is_running(self) -> bool {
        self == Lifecycle::Running
    }
}

/// Top-level game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    #[default]
    Menu,
    LevelIntro,
    Playing,
    LevelComplete,
    GameOver,
    Lobby,
    MpPlaying,
    MpResults,
}

impl GameState {
    pub const ALL: [GameState; 8] = [
        GameState::Menu,
        GameState::LevelIntro,
        GameState::Playing,
        GameState::LevelComplete,
        GameState::GameOver,
        GameState::Lobby,
        GameState::MpPlaying,
        GameState::MpResults,
    ];

    /// Name as the browser enum spells it
    pub fn name(self) -> &'static str {
        match self {
            GameState::Menu => "MENU",
            GameState::LevelIntro => "LEVEL_INTRO",
            GameState::Playing => "PLAYING",
            GameState::LevelComplete => "LEVEL_COMPLETE",
            GameState::GameOver => "GAME_OVER",
            GameState::Lobby => "LOBBY",
            GameState::MpPlaying => "MP_PLAYING",
            GameState::MpResults => "MP_RESULTS",
        }
    }

    pub fn is_multiplayer(self) -> bool {
        matches!(self, GameState::MpPlaying | GameState::MpResults)
    }
}

/// The local player
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub pos: Vec2,
    /// Facing, radians
    pub angle: f32,
    pub health: f32,
    pub alive: bool,
}

/// Multiplayer match state, as reported by the server
#[derive(Debug, Clone, PartialEq)]
pub struct MpState {
    pub local_player_id: Option<String>,
    pub remote_player: Option<RemotePlayerSnapshot>,
    pub local_tier: i32,
    pub remote_tier: i32,
    pub winner_id: Option<String>,
    pub match_time: f32,
}

impl Default for MpState {
    fn default() -> Self {
        Self {
            local_player_id: None,
            remote_player: None,
            local_tier: 0,
            remote_tier: 0,
            winner_id: None,
            match_time: 0.0,
        }
    }
}

/// Lobby UI phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyPhase {
    Menu,
    Connecting,
    InRoom,
    Ready,
}

/// Lobby screen, only instantiated while the lobby is shown
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyScreen {
    pub phase: LobbyPhase,
    pub room_code: Option<String>,
}

impl Default for LobbyScreen {
    fn default() -> Self {
        Self {
            phase: LobbyPhase::Menu,
            room_code: None,
        }
    }
}

/// Options the HUD consults while rendering
#[derive(Debug, Clone, Default)]
pub struct HudOptions {
    /// Skip the objective counter (multiplayer has no objectives)
    pub hide_objectives: bool,
}

/// Multiplayer assets loaded for the arena
#[derive(Debug, Clone, Default)]
pub struct MpAssets {
    pub map_loaded: bool,
    pub palette_loaded: bool,
}

/// Frame timing
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    pub last_timestamp: Option<f64>,
    pub frame: u64,
}

impl FrameClock {
    /// Start a frame at `timestamp` (ms) and return its dt in seconds.
    /// The first frame runs with a nominal dt; long stalls are capped.
    pub fn advance(&mut self, timestamp: f64) -> f32 {
        let dt = match self.last_timestamp {
            Some(last) => (((timestamp - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT),
            None => FRAME_DT,
        };
        self.last_timestamp = Some(timestamp);
        self.frame += 1;
        dt
    }
}

pub struct GameContext {
    pub lifecycle: Lifecycle,
    pub game_state: GameState,
    pub current_level_index: usize,
    /// Characters of the level intro text revealed so far
    pub intro_char_index: usize,
    pub player: Option<Player>,
    pub mp: Option<MpState>,
    pub mp_assets: MpAssets,
    pub input: InputState,
    pub lobby: Option<LobbyScreen>,
    pub network: Rc<dyn NetworkManager>,
    pub network_handlers_installed: bool,
    /// Test hook namespace present on this client
    pub hooks_installed: bool,
    pub display: Display,
    pub hud: HudOptions,
    pub clock: FrameClock,
}

impl GameContext {
    pub fn new(network: Rc<dyn NetworkManager>) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            game_state: GameState::Menu,
            current_level_index: 0,
            intro_char_index: 0,
            player: None,
            mp: None,
            mp_assets: MpAssets::default(),
            input: InputState::default(),
            lobby: None,
            network,
            network_handlers_installed: false,
            hooks_installed: false,
            display: Display::new(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            hud: HudOptions::default(),
            clock: FrameClock::default(),
        }
    }

    pub fn shared(self) -> SharedContext {
        Rc::new(RefCell::new(self))
    }

    /// Local player if it exists and is alive
    pub fn living_player(&self) -> Option<&Player> {
        self.player.as_ref().filter(|p| p.alive)
    }

    /// Remote player snapshot, if the match has reported one
    pub fn remote_player(&self) -> Option<&RemotePlayerSnapshot> {
        self.mp.as_ref().and_then(|mp| mp.remote_player.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_ordering() {
        assert!(!Lifecycle::Uninitialized.is_initialized());
        assert!(Lifecycle::Initialized.is_initialized());
        assert!(Lifecycle::Running.is_initialized());
        assert!(!Lifecycle::Initialized.is_running());
    }

    #[test]
    fn test_frame_clock_caps_stalls() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(1000.0), FRAME_DT);
        assert!((clock.advance(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.advance(9000.0), MAX_FRAME_DT);
        assert_eq!(clock.frame, 3);
    }

    #[test]
    fn test_game_state_names_match_serde() {
        for state in GameState::ALL {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json.as_str(), Some(state.name()));
        }
    }
}
