//! Headless reference client used by tests, scenario files and `simulate`
//!
//! Stands in for the black-box game: three levels, a loopback server with a
//! scripted opponent, fault injection and software rendering.

mod arena;
mod faults;
mod game;
mod network;
mod render;

pub use arena::{ARENA_LEVEL, LevelData, LevelDatabase, Objective, Pose, step_pose};
pub use faults::{FaultKind, FaultQueue};
pub use game::{SimEvent, SimGame};
pub use network::{LoopbackNetwork, OpponentConfig, OpponentScript};
pub use render::heartbeat_color;
