//! Playtest - test instrumentation for a browser FPS client
//!
//! The crate has two halves. Delivery (`bundle`, `server`, `settings`)
//! serves a submitted build with the instrumentation appended to its entry
//! script. The client model (`client`, `hooks`, `supervisor`, `agent`,
//! `instrument`) expresses the same instrumentation against a headless
//! reference client (`sim`) so it can be exercised end to end (`testing`).

// Delivery
pub mod bundle;
pub mod logging;
pub mod server;
pub mod settings;

// Client model and instrumentation
pub mod agent;
pub mod client;
pub mod hooks;
pub mod instrument;
pub mod supervisor;

// Reference client and scenario testing
pub mod sim;
pub mod testing;

// Shared
pub mod constants;
pub mod helpers;
pub mod tuning;

// Re-export commonly used types for convenience
pub use agent::{AgentHandle, CombatAgent, SyntheticInput};
pub use bundle::{BundleError, InstrumentationBundle};
pub use client::{Client, FrameError, Game, GameContext, GameState, InstallError, PatchRegistry};
pub use constants::*;
pub use helpers::*;
pub use hooks::{HookError, HookSurface, MpStatus, StateSnapshot};
pub use instrument::{InstrumentOptions, instrument};
pub use server::ServeState;
pub use settings::{ServerSettings, SettingsError, resolve_submission};
pub use supervisor::{CapturedError, ErrorSlot, LoopSupervisor};
pub use tuning::{AGENT_TUNING_FILE, AgentTuning, OpenArea};
