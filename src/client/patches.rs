//! Entrypoint table and the explicit patch registry
//!
//! Overrides are functions taking the original entrypoint and returning a
//! replacement. They are registered here and applied once, in registration
//! order, before the client composes its frame loop.

use std::any::Any;
use std::backtrace::Backtrace;
use thiserror::Error;
use tracing::debug;

use super::context::GameContext;

/// Uncaught failure raised during one frame's update or render pass
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FrameError {
    pub message: String,
    pub stack: String,
}

impl FrameError {
    /// Captures the stack unconditionally, whatever `RUST_BACKTRACE` says
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Backtrace::force_capture().to_string(),
        }
    }

    /// Convert a caught panic payload into a frame error. The stack is the
    /// catch site's; callers holding the panic site's stack replace it.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::new(message)
    }
}

pub type FrameResult = Result<(), FrameError>;

/// Per-frame update, receives dt in seconds
pub type UpdateFn = Box<dyn FnMut(&mut GameContext, f32) -> FrameResult>;
/// Per-frame render into the display back buffer
pub type RenderFn = Box<dyn FnMut(&mut GameContext) -> FrameResult>;
/// The composed frame callback, receives the frame timestamp in ms
pub type LoopFn = Box<dyn FnMut(f64) -> FrameResult>;

type Patch<F> = Box<dyn FnOnce(F) -> F>;

/// The client's function table
pub struct Entrypoints {
    pub update: UpdateFn,
    pub render: RenderFn,
    pub update_multiplayer: UpdateFn,
    pub render_multiplayer: RenderFn,
}

#[derive(Default)]
pub struct PatchRegistry {
    update: Vec<(&'static str, Patch<UpdateFn>)>,
    render: Vec<(&'static str, Patch<RenderFn>)>,
    update_multiplayer: Vec<(&'static str, Patch<UpdateFn>)>,
    render_multiplayer: Vec<(&'static str, Patch<RenderFn>)>,
    game_loop: Vec<(&'static str, Patch<LoopFn>)>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrap_update(&mut self, name: &'static str, patch: impl FnOnce(UpdateFn) -> UpdateFn + 'static) {
        self.update.push((name, Box::new(patch)));
    }

    pub fn wrap_render(&mut self, name: &'static str, patch: impl FnOnce(RenderFn) -> RenderFn + 'static) {
        self.render.push((name, Box::new(patch)));
    }

    pub fn wrap_update_multiplayer(
        &mut self,
        name: &'static str,
        patch: impl FnOnce(UpdateFn) -> UpdateFn + 'static,
    ) {
        self.update_multiplayer.push((name, Box::new(patch)));
    }

    pub fn wrap_render_multiplayer(
        &mut self,
        name: &'static str,
        patch: impl FnOnce(RenderFn) -> RenderFn + 'static,
    ) {
        self.render_multiplayer.push((name, Box::new(patch)));
    }

    pub fn wrap_loop(&mut self, name: &'static str, patch: impl FnOnce(LoopFn) -> LoopFn + 'static) {
        self.game_loop.push((name, Box::new(patch)));
    }

    /// Move every registration from `other` after this registry's own
    pub fn extend(&mut self, other: PatchRegistry) {
        self.update.extend(other.update);
        self.render.extend(other.render);
        self.update_multiplayer.extend(other.update_multiplayer);
        self.render_multiplayer.extend(other.render_multiplayer);
        self.game_loop.extend(other.game_loop);
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    /// Registered patch names, entrypoints first, loop patches last
    pub fn names(&self) -> Vec<&'static str> {
        self.update
            .iter()
            .map(|(n, _)| *n)
            .chain(self.render.iter().map(|(n, _)| *n))
            .chain(self.update_multiplayer.iter().map(|(n, _)| *n))
            .chain(self.render_multiplayer.iter().map(|(n, _)| *n))
            .chain(self.game_loop.iter().map(|(n, _)| *n))
            .collect()
    }

    /// Apply entrypoint patches, consuming them
    pub fn apply_to_entrypoints(&mut self, entry: Entrypoints) -> Entrypoints {
        Entrypoints {
            update: apply_all(entry.update, self.update.drain(..)),
            render: apply_all(entry.render, self.render.drain(..)),
            update_multiplayer: apply_all(entry.update_multiplayer, self.update_multiplayer.drain(..)),
            render_multiplayer: apply_all(entry.render_multiplayer, self.render_multiplayer.drain(..)),
        }
    }

    /// Apply loop patches, consuming them
    pub fn apply_to_loop(&mut self, game_loop: LoopFn) -> LoopFn {
        apply_all(game_loop, self.game_loop.drain(..))
    }
}

fn apply_all<F>(original: F, patches: impl Iterator<Item = (&'static str, Patch<F>)>) -> F {
    patches.fold(original, |current, (name, patch)| {
        debug!("Applying patch: {}", name);
        patch(current)
    })
}
