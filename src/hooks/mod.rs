//! Test hook surface - the namespace an external test driver calls into
//!
//! Every hook consults the context lifecycle before touching dependent state,
//! and accessors answer with neutral values when game objects are missing.

mod dispatch;
mod snapshot;

pub use dispatch::*;
pub use snapshot::*;

use std::rc::Rc;
use tracing::{info, warn};

use crate::agent::AgentHandle;
use crate::client::{
    ClientMessage, Client, FrameScheduler, Game, GameState, InstallError, LobbyPhase, NetworkError,
    SharedContext,
};
use crate::supervisor::ErrorSlot;

#[derive(Clone)]
pub struct HookSurface {
    ctx: SharedContext,
    game: Rc<dyn Game>,
    scheduler: FrameScheduler,
    agent: AgentHandle,
    errors: ErrorSlot,
}

impl HookSurface {
    /// Install the hook namespace on a client; once per client, and only
    /// after the game objects exist
    pub fn install(client: &Client, agent: AgentHandle, errors: ErrorSlot) -> Result<Self, InstallError> {
        let ctx = client.context();
        {
            let mut ctx = ctx.borrow_mut();
            if !ctx.lifecycle.is_initialized() {
                return Err(InstallError::NotInitialized);
            }
            if ctx.hooks_installed {
                return Err(InstallError::AlreadyInstalled);
            }
            ctx.hooks_installed = true;
        }
        info!("Test hooks installed ({} entries)", HOOK_NAMES.len());
        Ok(Self {
            ctx,
            game: client.game(),
            scheduler: client.scheduler(),
            agent,
            errors,
        })
    }

    // ==================== Level control ====================

    /// Load a level and show its intro. Rejected indices change nothing.
    pub fn load_level(&self, index: usize) -> bool {
        let mut ctx = self.ctx.borrow_mut();
        if !self.game.load_level(&mut ctx, index) {
            warn!("loadLevel({}) rejected, {} levels available", index, self.game.level_count());
            return false;
        }
        ctx.game_state = GameState::LevelIntro;
        ctx.intro_char_index = 0;
        true
    }

    pub fn skip_to_playing(&self) {
        self.ctx.borrow_mut().game_state = GameState::Playing;
    }

    pub fn get_state(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.ctx.borrow(), &self.errors)
    }

    pub fn game_state_names(&self) -> Vec<&'static str> {
        GameState::ALL.iter().map(|s| s.name()).collect()
    }

    // ==================== Lobby ====================

    pub fn go_to_lobby(&self) {
        self.ctx.borrow_mut().game_state = GameState::Lobby;
    }

    /// Connect, install handlers, then ask the server for a room
    pub async fn host_game(&self) -> Result<(), HookError> {
        self.ctx.borrow_mut().game_state = GameState::Lobby;
        self.connect().await?;
        self.send(ClientMessage::CreateRoom)
    }

    /// Join a room, connecting first only if needed
    pub async fn join_game(&self, room_code: &str) -> Result<(), HookError> {
        self.ctx.borrow_mut().game_state = GameState::Lobby;
        let connected = self.ctx.borrow().network.is_connected();
        if !connected {
            self.connect().await?;
        }
        self.send(ClientMessage::JoinRoom {
            room_code: room_code.to_string(),
        })
    }

    pub fn ready(&self) -> Result<(), HookError> {
        self.send(ClientMessage::Ready)
    }

    pub fn get_lobby_state(&self) -> Option<LobbyPhase> {
        self.ctx.borrow().lobby.as_ref().map(|l| l.phase)
    }

    pub fn get_room_code(&self) -> Option<String> {
        self.ctx.borrow().lobby.as_ref().and_then(|l| l.room_code.clone())
    }

    async fn connect(&self) -> Result<(), NetworkError> {
        // No context borrow may live across the await: frames keep running
        let handshake = {
            let ctx = self.ctx.borrow();
            ctx.network.connect()
        };
        handshake.await?;
        let mut ctx = self.ctx.borrow_mut();
        self.game.setup_network_handlers(&mut ctx);
        Ok(())
    }

    fn send(&self, message: ClientMessage) -> Result<(), HookError> {
        let network = self.ctx.borrow().network.clone();
        network.send(message)?;
        Ok(())
    }

    // ==================== Display and input ====================

    pub fn is_pointer_locked(&self) -> bool {
        self.ctx.borrow().input.pointer_locked
    }

    /// Visible frame as a PNG data URL; None until the loop runs
    pub fn get_canvas_data(&self) -> Option<String> {
        let ctx = self.ctx.borrow();
        if !ctx.lifecycle.is_running() {
            return None;
        }
        match ctx.display.to_data_url() {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("Canvas capture failed: {}", err);
                None
            }
        }
    }

    /// Request a frame, restarting a loop that stopped scheduling itself
    pub fn restart_loop(&self) {
        self.scheduler.request_frame();
    }

    // ==================== Agent ====================

    pub fn start_auto_p1(&self) {
        self.agent.start();
    }

    pub fn stop_auto_p1(&self) {
        self.agent.stop();
    }

    pub fn get_mp_status(&self) -> MpStatus {
        MpStatus::capture(&self.ctx.borrow(), &self.agent, &self.errors)
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub fn agent(&self) -> &AgentHandle {
        &self.agent
    }
}
