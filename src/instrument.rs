//! Installs the instrumentation on a client before its loop starts:
//! hook surface, multiplayer HUD patch, combat agent and loop supervisor.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use tracing::info;

use crate::agent::{AgentHandle, CombatAgent};
use crate::client::{Client, InstallError, PatchRegistry, RenderFn};
use crate::hooks::HookSurface;
use crate::supervisor::{ErrorSlot, LoopSupervisor};
use crate::tuning::AgentTuning;

/// Name of the multiplayer HUD patch
pub const HUD_PATCH: &str = "mp-hud-objectives";

/// Which pieces to install
#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    pub tuning: AgentTuning,
    pub hud_patch: bool,
    pub supervisor: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self {
            tuning: AgentTuning::default(),
            hud_patch: true,
            supervisor: true,
        }
    }
}

/// Multiplayer render wrapper: the HUD skips the objective counter for the
/// duration of the call, and the previous setting comes back afterwards
pub fn hud_patch(mut original: RenderFn) -> RenderFn {
    Box::new(move |ctx| {
        let previous = std::mem::replace(&mut ctx.hud.hide_objectives, true);
        let result = catch_unwind(AssertUnwindSafe(|| original(ctx)));
        ctx.hud.hide_objectives = previous;
        match result {
            Ok(result) => result,
            Err(payload) => resume_unwind(payload),
        }
    })
}

/// Install everything on a client that has not started yet
pub fn instrument(client: &mut Client, options: InstrumentOptions) -> Result<HookSurface, InstallError> {
    if client.lifecycle().is_running() {
        return Err(InstallError::AlreadyRunning);
    }
    let agent = AgentHandle::new();
    let errors = ErrorSlot::new();
    let hooks = HookSurface::install(client, agent.clone(), errors.clone())?;

    let mut registry = PatchRegistry::new();
    if options.hud_patch {
        registry.wrap_render_multiplayer(HUD_PATCH, hud_patch);
    }
    CombatAgent::new(agent, options.tuning).register(&mut registry);
    if options.supervisor {
        LoopSupervisor::new(client.context(), client.scheduler(), errors).register(&mut registry);
    }
    client.apply_patches(registry)?;

    info!("Instrumentation installed");
    Ok(hooks)
}
