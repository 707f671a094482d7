//! Software rendering of the reference client into the display back buffer

use image::{Rgba, RgbaImage};

use super::arena::Objective;
use crate::client::{FrameError, FrameResult, GameState};
use crate::constants::{ARENA_SIZE, PLAYER_MAX_HEALTH};
use crate::helpers::Vec2;

const PLAYER_COLOR: Rgba<u8> = Rgba([80, 220, 120, 255]);
const REMOTE_COLOR: Rgba<u8> = Rgba([230, 70, 70, 255]);
const DOWNED_COLOR: Rgba<u8> = Rgba([90, 90, 90, 255]);
const HUD_COLOR: Rgba<u8> = Rgba([240, 240, 240, 255]);
const HUD_BACK: Rgba<u8> = Rgba([30, 30, 30, 255]);

/// Per-frame marker drawn at (0, 0) so captures can tell frames apart
pub fn heartbeat_color(frame: u64) -> Rgba<u8> {
    Rgba([(frame % 256) as u8, 0x40, 0x80, 255])
}

pub fn background(state: GameState) -> Rgba<u8> {
    match state {
        GameState::Menu => Rgba([12, 12, 40, 255]),
        GameState::LevelIntro => Rgba([0, 0, 0, 255]),
        GameState::Playing => Rgba([40, 36, 30, 255]),
        GameState::LevelComplete => Rgba([20, 60, 20, 255]),
        GameState::GameOver => Rgba([60, 10, 10, 255]),
        GameState::Lobby => Rgba([20, 30, 50, 255]),
        GameState::MpPlaying => Rgba([34, 34, 44, 255]),
        GameState::MpResults => Rgba([50, 40, 20, 255]),
    }
}

pub fn clear(buffer: &mut RgbaImage, color: Rgba<u8>) {
    for pixel in buffer.pixels_mut() {
        *pixel = color;
    }
}

pub fn fill_rect(buffer: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) {
    let (bw, bh) = (buffer.width() as i64, buffer.height() as i64);
    for py in y.max(0)..(y + h).min(bh) {
        for px in x.max(0)..(x + w).min(bw) {
            buffer.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// Map a world position onto the buffer
fn to_screen(buffer: &RgbaImage, pos: Vec2) -> (i64, i64) {
    (
        (pos.x / ARENA_SIZE * buffer.width() as f32) as i64,
        (pos.y / ARENA_SIZE * buffer.height() as f32) as i64,
    )
}

pub fn draw_player(buffer: &mut RgbaImage, pos: Vec2, angle: f32, alive: bool) {
    let (x, y) = to_screen(buffer, pos);
    let color = if alive { PLAYER_COLOR } else { DOWNED_COLOR };
    fill_rect(buffer, x - 2, y - 2, 5, 5, color);
    // Facing tick
    let (sin, cos) = angle.sin_cos();
    fill_rect(buffer, x + (cos * 4.0) as i64, y + (sin * 4.0) as i64, 1, 1, HUD_COLOR);
}

pub fn draw_remote(buffer: &mut RgbaImage, pos: Vec2, alive: bool) {
    let (x, y) = to_screen(buffer, pos);
    let color = if alive { REMOTE_COLOR } else { DOWNED_COLOR };
    fill_rect(buffer, x - 2, y - 2, 5, 5, color);
}

pub fn draw_health_bar(buffer: &mut RgbaImage, health: f32) {
    let width = 40;
    let filled = ((health / PLAYER_MAX_HEALTH).clamp(0.0, 1.0) * width as f32) as i64;
    let y = buffer.height() as i64 - 6;
    fill_rect(buffer, 4, y, width, 3, HUD_BACK);
    fill_rect(buffer, 4, y, filled, 3, PLAYER_COLOR);
}

/// Objective counter in the top-right corner: one pip per objective.
/// An empty objective state has no label to show.
pub fn draw_objective_counter(buffer: &mut RgbaImage, objective: Option<&Objective>) -> FrameResult {
    let objective = objective.ok_or_else(|| FrameError::new("objective counter has no label: objective state is empty"))?;
    let right = buffer.width() as i64 - 4;
    for i in 0..objective.total as i64 {
        let color = if (i as u32) < objective.current { HUD_COLOR } else { HUD_BACK };
        fill_rect(buffer, right - (i + 1) * 4, 2, 3, 3, color);
    }
    Ok(())
}

/// Intro text cursor as a progress line along the top
pub fn draw_intro_progress(buffer: &mut RgbaImage, revealed: usize, total: usize) {
    if total == 0 {
        return;
    }
    let width = (revealed.min(total) as f32 / total as f32 * buffer.width() as f32) as i64;
    fill_rect(buffer, 0, 2, width, 1, HUD_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips_to_buffer() {
        let mut buffer = RgbaImage::new(8, 8);
        fill_rect(&mut buffer, -3, 6, 5, 5, HUD_COLOR);
        assert_eq!(*buffer.get_pixel(0, 7), HUD_COLOR);
        assert_eq!(*buffer.get_pixel(1, 6), HUD_COLOR);
        assert_eq!(*buffer.get_pixel(2, 6), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_empty_objective_state_fails() {
        let mut buffer = RgbaImage::new(32, 32);
        assert!(draw_objective_counter(&mut buffer, None).is_err());
        let objective = Objective {
            label: "Targets".to_string(),
            current: 1,
            total: 3,
        };
        assert!(draw_objective_counter(&mut buffer, Some(&objective)).is_ok());
    }
}
