//! Read-only state snapshots returned by `getState()` and `_getMpStatus()`
//!
//! Field names follow the browser hook contract (camelCase).

use serde::Serialize;

use crate::agent::AgentHandle;
use crate::client::{GameContext, GameState};
use crate::supervisor::ErrorSlot;

/// Result of `getState()`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub game_state: GameState,
    pub current_level_index: usize,
    /// Null when there is no player
    #[serde(rename = "playerHP")]
    pub player_hp: Option<f32>,
    pub has_player: bool,
    pub has_mp_map: bool,
    pub has_mp_palette: bool,
    pub loop_error: Option<String>,
}

impl StateSnapshot {
    pub fn capture(ctx: &GameContext, errors: &ErrorSlot) -> Self {
        Self {
            game_state: ctx.game_state,
            current_level_index: ctx.current_level_index,
            player_hp: ctx.player.as_ref().map(|p| p.health),
            has_player: ctx.player.is_some(),
            has_mp_map: ctx.mp_assets.map_loaded,
            has_mp_palette: ctx.mp_assets.palette_loaded,
            loop_error: errors.loop_error(),
        }
    }
}

/// Result of `_getMpStatus()`: neutral defaults for anything missing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MpStatus {
    pub game_state: GameState,
    pub local_tier: i32,
    pub remote_tier: i32,
    pub winner_id: Option<String>,
    pub local_id: Option<String>,
    pub match_time: f32,
    pub player_alive: bool,
    #[serde(rename = "playerHP")]
    pub player_hp: f32,
    pub player_x: f32,
    pub player_y: f32,
    pub player_angle: f32,
    pub remote_alive: bool,
    pub remote_x: f32,
    pub remote_y: f32,
    pub auto_p1_active: bool,
    pub auto_p1_tick: u64,
    pub loop_error: Option<String>,
}

impl MpStatus {
    pub fn capture(ctx: &GameContext, agent: &AgentHandle, errors: &ErrorSlot) -> Self {
        let mp = ctx.mp.as_ref();
        let player = ctx.player.as_ref();
        let remote = ctx.remote_player();
        let remote_pos = remote.and_then(|rp| rp.pos);
        Self {
            game_state: ctx.game_state,
            local_tier: mp.map_or(-1, |mp| mp.local_tier),
            remote_tier: mp.map_or(-1, |mp| mp.remote_tier),
            winner_id: mp.and_then(|mp| mp.winner_id.clone()),
            local_id: mp.and_then(|mp| mp.local_player_id.clone()),
            match_time: mp.map_or(0.0, |mp| mp.match_time),
            player_alive: player.is_some_and(|p| p.alive),
            player_hp: player.map_or(0.0, |p| p.health),
            player_x: player.map_or(0.0, |p| p.pos.x),
            player_y: player.map_or(0.0, |p| p.pos.y),
            player_angle: player.map_or(0.0, |p| p.angle),
            remote_alive: remote.is_some_and(|rp| rp.alive),
            remote_x: remote_pos.map_or(0.0, |p| p.x),
            remote_y: remote_pos.map_or(0.0, |p| p.y),
            auto_p1_active: agent.is_active(),
            auto_p1_tick: agent.tick(),
            loop_error: errors.loop_error(),
        }
    }
}
