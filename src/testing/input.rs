//! Scripted steps and human input injection for scenarios

use std::collections::BTreeMap;

use super::parser::{InputSnapshot, Step};
use crate::client::InputState;

/// Steps grouped by the frame they run before
#[derive(Debug, Default)]
pub struct ScriptedSteps {
    frames: BTreeMap<u64, Vec<Step>>,
    /// Maximum frame to run
    pub max_frame: u64,
}

impl ScriptedSteps {
    /// Create from parsed steps, keeping file order within a frame
    pub fn from_steps(steps: &[Step]) -> Self {
        let mut frames: BTreeMap<u64, Vec<Step>> = BTreeMap::new();
        let mut max_frame = 0u64;

        for step in steps {
            max_frame = max_frame.max(step.frame);
            frames.entry(step.frame).or_default().push(step.clone());
        }

        Self { frames, max_frame }
    }

    /// Set max frame (for state assertions)
    pub fn set_max_frame(&mut self, frame: u64) {
        self.max_frame = self.max_frame.max(frame);
    }

    /// Steps scheduled at `frame`; each is handed out once
    pub fn take(&mut self, frame: u64) -> Vec<Step> {
        self.frames.remove(&frame).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Apply a human input snapshot. Only fields that are set change; mouse
/// deltas accumulate like real pointer motion between frames.
pub fn apply_input(input: &mut InputState, snapshot: &InputSnapshot) {
    if let Some(keys) = &snapshot.keys {
        input.keys_down = keys.iter().copied().collect();
    }
    if let Some(dx) = snapshot.mouse_dx {
        input.mouse_delta_x += dx;
    }
    if let Some(dy) = snapshot.mouse_dy {
        input.mouse_delta_y += dy;
    }
    if let Some(fire) = snapshot.fire {
        // Press is a one-frame edge
        input.mouse_pressed = fire && !input.mouse_down;
        input.mouse_down = fire;
    }
}
