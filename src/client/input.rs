//! Input module - the client's InputState and key codes
//!
//! Human input and the autonomous agent both write here; the multiplayer
//! update reads from this one source.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Keyboard codes the game reads (DOM `KeyboardEvent.code` names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    Space,
    Tab,
}

impl KeyCode {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyCode::KeyW => "KeyW",
            KeyCode::KeyA => "KeyA",
            KeyCode::KeyS => "KeyS",
            KeyCode::KeyD => "KeyD",
            KeyCode::Space => "Space",
            KeyCode::Tab => "Tab",
        }
    }
}

/// Buffered input state consumed by the per-frame update
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keys_down: BTreeSet<KeyCode>,
    pub mouse_delta_x: f32,
    pub mouse_delta_y: f32,
    pub mouse_down: bool,    // Fire held
    pub mouse_pressed: bool, // Fire pressed this frame
    pub pointer_locked: bool,
}

impl InputState {
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Held keys in a stable order, for the wire
    pub fn keys(&self) -> Vec<KeyCode> {
        self.keys_down.iter().copied().collect()
    }

    /// Mouse deltas accumulate between frames; the update consumes them
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        let delta = (self.mouse_delta_x, self.mouse_delta_y);
        self.mouse_delta_x = 0.0;
        self.mouse_delta_y = 0.0;
        delta
    }

    /// Clear one-frame flags after the update has read them
    pub fn end_frame(&mut self) {
        self.mouse_pressed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_sorted_and_serialized_as_dom_codes() {
        let mut input = InputState::default();
        input.keys_down.insert(KeyCode::KeyD);
        input.keys_down.insert(KeyCode::KeyW);
        assert_eq!(input.keys(), vec![KeyCode::KeyW, KeyCode::KeyD]);
        let json = serde_json::to_string(&input.keys()).unwrap();
        assert_eq!(json, r#"["KeyW","KeyD"]"#);
    }

    #[test]
    fn test_take_mouse_delta_consumes() {
        let mut input = InputState {
            mouse_delta_x: 12.0,
            mouse_delta_y: -3.0,
            ..Default::default()
        };
        assert_eq!(input.take_mouse_delta(), (12.0, -3.0));
        assert_eq!(input.take_mouse_delta(), (0.0, 0.0));
    }
}
