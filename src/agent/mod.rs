//! Agent module - autonomous combat agent for the local multiplayer player
//!
//! When active, the agent writes synthetic input into the client's
//! `InputState` before the normal multiplayer update consumes it, so the
//! weapon, movement and network-send paths run unmodified.

mod decision;
mod navigation;

pub use decision::*;
pub use navigation::*;

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

use crate::client::{GameContext, GameState, PatchRegistry, UpdateFn};
use crate::helpers::normalize_angle;
use crate::tuning::AgentTuning;

/// Name the agent registers its multiplayer update patch under
pub const AGENT_PATCH: &str = "auto-p1";

/// Agent activation and progress
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub active: bool,
    /// Driven frames since the last start
    pub tick: u64,
    /// Input synthesized on the most recent multiplayer frame (None if not driven)
    pub last_input: Option<SyntheticInput>,
    pub last_target: Option<NavTarget>,
    /// Synthetic input is still sitting in `InputState`
    pub holding: bool,
}

/// Shared handle: start/stop from the hook surface, read/advance per frame
#[derive(Debug, Clone, Default)]
pub struct AgentHandle {
    state: Rc<RefCell<AgentState>>,
}

impl AgentHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate and reset the tick counter; idempotent
    pub fn start(&self) {
        let mut state = self.state.borrow_mut();
        state.active = true;
        state.tick = 0;
        info!("[AutoP1] Started - overriding multiplayer input");
    }

    /// Deactivate; takes effect at the next frame boundary, where the
    /// agent's held input is released
    pub fn stop(&self) {
        self.state.borrow_mut().active = false;
        info!("[AutoP1] Stopped");
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn tick(&self) -> u64 {
        self.state.borrow().tick
    }

    pub fn snapshot(&self) -> AgentState {
        self.state.borrow().clone()
    }
}

pub struct CombatAgent {
    handle: AgentHandle,
    tuning: AgentTuning,
}

impl CombatAgent {
    pub fn new(handle: AgentHandle, tuning: AgentTuning) -> Self {
        Self { handle, tuning }
    }

    /// Run one driven frame if the agent should act, delivering its input
    pub fn drive(&self, ctx: &mut GameContext) -> Option<SyntheticInput> {
        let mut state = self.handle.state.borrow_mut();
        state.last_input = None;
        state.last_target = None;
        if !state.active {
            if std::mem::take(&mut state.holding) {
                release(ctx);
                debug!("[AutoP1] Released synthetic input");
            }
            return None;
        }
        if ctx.game_state != GameState::MpPlaying {
            return None;
        }
        let opponent = ctx
            .remote_player()
            .filter(|rp| rp.alive)
            .and_then(|rp| rp.pos);
        let player = ctx.player.as_mut().filter(|p| p.alive)?;

        state.tick += 1;
        player.angle = normalize_angle(player.angle);
        let obs = Observation {
            pos: player.pos,
            angle: player.angle,
            opponent,
        };
        let decision = decide(&self.tuning, state.tick, &obs);
        debug!(
            "[AutoP1] tick {} {:?} -> ({:.1}, {:.1}) dx {:.1} fire {}",
            state.tick,
            decision.target.phase,
            decision.target.point.x,
            decision.target.point.y,
            decision.input.mouse_dx,
            decision.input.firing
        );

        deliver(ctx, &decision.input);
        state.holding = true;
        state.last_target = Some(decision.target);
        state.last_input = Some(decision.input.clone());
        Some(decision.input)
    }

    /// Wrap the multiplayer update so the agent runs before it
    pub fn register(self, registry: &mut PatchRegistry) {
        registry.wrap_update_multiplayer(AGENT_PATCH, move |mut original: UpdateFn| -> UpdateFn {
            Box::new(move |ctx, dt| {
                self.drive(ctx);
                original(ctx, dt)
            })
        });
    }
}

/// Write synthetic input where human input would land
fn deliver(ctx: &mut GameContext, input: &SyntheticInput) {
    let state = &mut ctx.input;
    state.keys_down.clear();
    state.keys_down.extend(input.keys.iter().copied());
    state.mouse_delta_x = input.mouse_dx;
    state.mouse_delta_y = input.mouse_dy;
    state.mouse_down = input.firing;
    state.mouse_pressed = input.firing;
}

/// Drop everything `deliver` wrote
fn release(ctx: &mut GameContext) {
    let state = &mut ctx.input;
    state.keys_down.clear();
    state.mouse_delta_x = 0.0;
    state.mouse_delta_y = 0.0;
    state.mouse_down = false;
    state.mouse_pressed = false;
}
