//! Client module - the typed model of the instrumented game client
//!
//! The game itself is a black box behind [`Game`] and its [`Entrypoints`];
//! the client owns the shared [`GameContext`], applies registered patches
//! and drives the composed frame loop through the [`FrameScheduler`].

pub mod context;
pub mod display;
pub mod input;
pub mod network;
pub mod patches;
pub mod scheduler;

pub use context::{
    FrameClock, GameContext, GameState, HudOptions, Lifecycle, LobbyPhase, LobbyScreen, MpAssets,
    MpState, Player, SharedContext,
};
pub use display::Display;
pub use input::{InputState, KeyCode};
pub use network::{ClientMessage, Handshake, NetworkError, NetworkManager, RemotePlayerSnapshot, ServerMessage};
pub use patches::{Entrypoints, FrameError, FrameResult, LoopFn, PatchRegistry, RenderFn, UpdateFn};
pub use scheduler::FrameScheduler;

use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::constants::FRAME_MS;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstallError {
    #[error("client context is not initialized")]
    NotInitialized,
    #[error("frame loop is already running")]
    AlreadyRunning,
    #[error("hook surface is already installed")]
    AlreadyInstalled,
}

/// The black-box game the client runs
pub trait Game {
    /// Create the game objects the context starts with
    fn init(&self, ctx: &mut GameContext);

    fn level_count(&self) -> usize;

    /// Load a level; false if the index is rejected (state untouched)
    fn load_level(&self, ctx: &mut GameContext, index: usize) -> bool;

    /// Register handlers for inbound server messages
    fn setup_network_handlers(&self, ctx: &mut GameContext);

    fn handle_message(&self, ctx: &mut GameContext, message: ServerMessage);

    fn entrypoints(&self) -> Entrypoints;
}

pub struct Client {
    ctx: SharedContext,
    scheduler: FrameScheduler,
    game: Rc<dyn Game>,
    patches: PatchRegistry,
    game_loop: Option<LoopFn>,
    /// Timestamp handed to the next frame, ms
    now: f64,
}

impl Client {
    /// Boot the game into an initialized (not yet running) context
    pub fn new(game: Rc<dyn Game>, network: Rc<dyn NetworkManager>) -> Self {
        let ctx = GameContext::new(network).shared();
        {
            let mut ctx = ctx.borrow_mut();
            game.init(&mut ctx);
            ctx.lifecycle = Lifecycle::Initialized;
        }
        Self {
            ctx,
            scheduler: FrameScheduler::new(),
            game,
            patches: PatchRegistry::new(),
            game_loop: None,
            now: 0.0,
        }
    }

    pub fn context(&self) -> SharedContext {
        self.ctx.clone()
    }

    pub fn scheduler(&self) -> FrameScheduler {
        self.scheduler.clone()
    }

    pub fn game(&self) -> Rc<dyn Game> {
        self.game.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.ctx.borrow().lifecycle
    }

    /// Queue patches for the next `start`; rejected once the loop runs
    pub fn apply_patches(&mut self, registry: PatchRegistry) -> Result<(), InstallError> {
        if self.lifecycle().is_running() {
            return Err(InstallError::AlreadyRunning);
        }
        self.patches.extend(registry);
        Ok(())
    }

    /// Apply patches, compose the frame loop and schedule the first frame
    pub fn start(&mut self) -> Result<(), InstallError> {
        match self.lifecycle() {
            Lifecycle::Uninitialized => return Err(InstallError::NotInitialized),
            Lifecycle::Running => return Err(InstallError::AlreadyRunning),
            Lifecycle::Initialized => {}
        }
        let names = self.patches.names();
        if !names.is_empty() {
            info!("Applying {} patches: {}", names.len(), names.join(", "));
        }
        let entry = self.patches.apply_to_entrypoints(self.game.entrypoints());
        let game_loop = compose_loop(self.ctx.clone(), self.scheduler.clone(), self.game.clone(), entry);
        self.game_loop = Some(self.patches.apply_to_loop(game_loop));
        self.ctx.borrow_mut().lifecycle = Lifecycle::Running;
        self.scheduler.request_frame();
        Ok(())
    }

    /// Run the loop callback at `timestamp` if a frame was requested.
    /// Returns whether a frame ran.
    pub fn tick(&mut self, timestamp: f64) -> bool {
        self.now = timestamp;
        if !self.scheduler.take_request() {
            return false;
        }
        let Some(game_loop) = self.game_loop.as_mut() else {
            return false;
        };
        if let Err(err) = game_loop(timestamp) {
            error!("Uncaught error in frame loop, loop stopped: {}", err);
        }
        true
    }

    /// Advance one nominal frame
    pub fn step(&mut self) -> bool {
        self.tick(self.now + FRAME_MS)
    }

    /// Whether another frame is scheduled
    pub fn is_looping(&self) -> bool {
        self.scheduler.is_requested()
    }
}

fn compose_loop(
    ctx: SharedContext,
    scheduler: FrameScheduler,
    game: Rc<dyn Game>,
    mut entry: Entrypoints,
) -> LoopFn {
    Box::new(move |timestamp| {
        let mut ctx = ctx.borrow_mut();
        let dt = ctx.clock.advance(timestamp);

        let network = ctx.network.clone();
        for message in network.poll() {
            if ctx.network_handlers_installed {
                game.handle_message(&mut ctx, message);
            } else {
                debug!("Dropping {:?}, no network handlers installed", message);
            }
        }

        if ctx.game_state.is_multiplayer() {
            (entry.update_multiplayer)(&mut ctx, dt)?;
            (entry.render_multiplayer)(&mut ctx)?;
        } else {
            (entry.update)(&mut ctx, dt)?;
            (entry.render)(&mut ctx)?;
        }

        ctx.display.present();
        ctx.input.end_frame();
        scheduler.request_frame();
        Ok(())
    })
}
