//! Tunable constants for playtest
//!
//! Server defaults, agent thresholds and reference-client values are all
//! defined here for easy tweaking.

// =============================================================================
// DELIVERY
// =============================================================================

/// Default listen port for the evaluation server
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// Path of the client's entry script, relative to the served root
pub const DEFAULT_ENTRY_PATH: &str = "/src/main.js";
pub const DEFAULT_SUBMISSIONS_DIR: &str = "submissions";
/// Placeholder file kept in empty submission directories
pub const SUBMISSIONS_PLACEHOLDER: &str = ".gitkeep";
pub const BUNDLE_CONTENT_TYPE: &str = "application/javascript";

// =============================================================================
// HOOK SURFACE
// =============================================================================

/// Global namespace object the hook surface is installed under
pub const HOOK_NAMESPACE: &str = "_test";

// =============================================================================
// AUTONOMOUS AGENT (tuned to the multiplayer arena)
// =============================================================================

// Open-area rectangle: y > OPEN_AREA_MIN_Y and OPEN_AREA_MIN_X < x < OPEN_AREA_MAX_X.
// Walls at x=6 and x=25 near y=0..3 form the spawn corridors.
pub const OPEN_AREA_MIN_Y: f32 = 6.0;
pub const OPEN_AREA_MIN_X: f32 = 8.0;
pub const OPEN_AREA_MAX_X: f32 = 24.0;

/// Waypoint known to lie in open space
pub const OPEN_AREA_WAYPOINT: (f32, f32) = (16.0, 12.0);

pub const WANDER_CENTER: (f32, f32) = (16.0, 16.0);
pub const WANDER_RADIUS: f32 = 5.0;
pub const WANDER_RATE: f32 = 0.01; // Radians per agent tick

/// Radians of rotation per unit of horizontal mouse delta
pub const MOUSE_SENSITIVITY: f32 = 0.003;
pub const MAX_MOUSE_DELTA: f32 = 150.0; // Per-frame clamp to avoid overcorrection

pub const STRAFE_CYCLE: u64 = 80; // Ticks per weave cycle
pub const STRAFE_LEFT_END: u64 = 20; // [0, 20) strafes left
pub const STRAFE_RIGHT_START: u64 = 40; // [40, 60) strafes right
pub const STRAFE_RIGHT_END: u64 = 60;

pub const FIRE_ANGLE_TOLERANCE: f32 = 0.44; // Radians
pub const FIRE_MAX_RANGE: f32 = 20.0;

// =============================================================================
// REFERENCE CLIENT
// =============================================================================

pub const FRAME_DT: f32 = 1.0 / 60.0;
pub const FRAME_MS: f64 = 1000.0 / 60.0;
/// Longest step the client integrates in one frame (tab was backgrounded)
pub const MAX_FRAME_DT: f32 = 0.1;

pub const DISPLAY_WIDTH: u32 = 160;
pub const DISPLAY_HEIGHT: u32 = 120;

pub const PLAYER_MAX_HEALTH: f32 = 100.0;
pub const PLAYER_MOVE_SPEED: f32 = 3.0; // Units per second
pub const WEAPON_COOLDOWN: f32 = 0.25; // Seconds between shots
pub const WEAPON_DAMAGE: f32 = 10.0;
pub const WEAPON_RANGE: f32 = 24.0;
pub const WEAPON_HIT_CONE: f32 = 0.2; // Radians either side of facing

pub const ARENA_SIZE: f32 = 32.0;
pub const ARENA_MARGIN: f32 = 1.0; // Players stay this far inside the outer walls

/// Characters per second revealed on the level intro screen
pub const INTRO_CHARS_PER_SEC: f32 = 40.0;

pub const ROOM_CODE_LEN: usize = 4;
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Kills needed to win a multiplayer match
pub const MATCH_WIN_TIER: i32 = 3;
pub const RESPAWN_TIME: f32 = 2.0; // Seconds a downed player waits
pub const OPPONENT_SPAWN: (f32, f32) = (16.0, 20.0);
pub const OPPONENT_PATROL_SPEED: f32 = 2.0;
