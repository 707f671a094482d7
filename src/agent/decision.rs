//! Agent decision - turns one frame's observation into synthetic input

use std::collections::BTreeSet;

use super::navigation::{NavTarget, select_target};
use crate::client::KeyCode;
use crate::helpers::{Vec2, shortest_angle_diff};
use crate::tuning::AgentTuning;

/// What the agent sees at the start of a driven frame
#[derive(Clone, Copy, Debug)]
pub struct Observation {
    pub pos: Vec2,
    /// Facing angle, already normalized
    pub angle: f32,
    /// Opponent position, only when the opponent is alive and positioned
    pub opponent: Option<Vec2>,
}

/// Input synthesized for one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyntheticInput {
    pub keys: BTreeSet<KeyCode>,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
    pub firing: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub target: NavTarget,
    pub input: SyntheticInput,
}

/// Horizontal mouse delta that turns `angle` toward `target`, bounded so one
/// frame cannot overcorrect
pub fn aim_delta(tuning: &AgentTuning, pos: Vec2, angle: f32, target: Vec2) -> f32 {
    let diff = shortest_angle_diff(angle, pos.bearing_to(target));
    (diff / tuning.mouse_sensitivity).clamp(-tuning.max_mouse_delta, tuning.max_mouse_delta)
}

/// Movement keys for a tick: always forward, weaving left then right
pub fn movement_keys(tuning: &AgentTuning, tick: u64) -> BTreeSet<KeyCode> {
    let mut keys = BTreeSet::from([KeyCode::KeyW]);
    if tuning.strafe_cycle == 0 {
        return keys;
    }
    let (left_end, right_start, right_end) = tuning.strafe_windows();
    let phase = tick % tuning.strafe_cycle;
    if phase < left_end {
        keys.insert(KeyCode::KeyA);
    } else if phase >= right_start && phase < right_end {
        keys.insert(KeyCode::KeyD);
    }
    keys
}

/// Fire only at a live, positioned opponent that is in range and near the crosshair
pub fn should_fire(tuning: &AgentTuning, pos: Vec2, angle: f32, opponent: Option<Vec2>) -> bool {
    let Some(opponent) = opponent else {
        return false;
    };
    let diff = shortest_angle_diff(angle, pos.bearing_to(opponent));
    diff.abs() < tuning.fire_angle_tolerance && pos.distance(opponent) < tuning.fire_max_range
}

pub fn decide(tuning: &AgentTuning, tick: u64, obs: &Observation) -> Decision {
    let target = select_target(tuning, tick, obs.pos, obs.opponent);
    Decision {
        target,
        input: SyntheticInput {
            keys: movement_keys(tuning, tick),
            mouse_dx: aim_delta(tuning, obs.pos, obs.angle, target.point),
            mouse_dy: 0.0,
            firing: should_fire(tuning, obs.pos, obs.angle, obs.opponent),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::navigation::NavPhase;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_aim_delta_is_clamped() {
        let tuning = AgentTuning::default();
        let pos = Vec2::new(16.0, 16.0);
        // Target straight behind: diff of π -> 1047 before clamping
        let delta = aim_delta(&tuning, pos, 0.0, Vec2::new(10.0, 16.0));
        assert_eq!(delta.abs(), 150.0);
        // Small correction stays proportional
        let delta = aim_delta(&tuning, pos, 0.0, Vec2::new(26.0, 16.3));
        let expected = (0.3_f32).atan2(10.0) / 0.003;
        assert!((delta - expected).abs() < 1e-3);
    }

    #[test]
    fn test_aim_uses_shortest_rotation_across_wrap() {
        let tuning = AgentTuning::default();
        // Facing just under π, target just past -π: turn a little, positive
        let pos = Vec2::new(16.0, 16.0);
        let target = Vec2::new(10.0, 15.9);
        let delta = aim_delta(&tuning, pos, PI - 0.01, target);
        assert!(delta.abs() < 150.0);
        assert!(delta > 0.0);
    }

    #[test]
    fn test_strafe_windows() {
        let tuning = AgentTuning::default();
        let keys_at = |tick| movement_keys(&tuning, tick);
        assert_eq!(keys_at(0), BTreeSet::from([KeyCode::KeyW, KeyCode::KeyA]));
        assert_eq!(keys_at(19), BTreeSet::from([KeyCode::KeyW, KeyCode::KeyA]));
        assert_eq!(keys_at(20), BTreeSet::from([KeyCode::KeyW]));
        assert_eq!(keys_at(40), BTreeSet::from([KeyCode::KeyW, KeyCode::KeyD]));
        assert_eq!(keys_at(59), BTreeSet::from([KeyCode::KeyW, KeyCode::KeyD]));
        assert_eq!(keys_at(60), BTreeSet::from([KeyCode::KeyW]));
        assert_eq!(keys_at(80), BTreeSet::from([KeyCode::KeyW, KeyCode::KeyA]));
    }

    #[test]
    fn test_fire_gate() {
        let tuning = AgentTuning::default();
        let pos = Vec2::new(16.0, 10.0);
        // Opponent straight down +y, facing +y
        let opponent = Vec2::new(16.0, 20.0);
        assert!(should_fire(&tuning, pos, FRAC_PI_2, Some(opponent)));
        // Just outside the tolerance
        assert!(!should_fire(&tuning, pos, FRAC_PI_2 + 0.45, Some(opponent)));
        // Out of range
        assert!(!should_fire(&tuning, pos, FRAC_PI_2, Some(Vec2::new(16.0, 30.5))));
        // Unknown or dead opponent never fires
        assert!(!should_fire(&tuning, pos, FRAC_PI_2, None));
    }

    #[test]
    fn test_dead_opponent_wanders_and_holds_fire() {
        let tuning = AgentTuning::default();
        let obs = Observation {
            pos: Vec2::new(16.0, 12.0),
            angle: 0.0,
            opponent: None,
        };
        for tick in 1..200 {
            let decision = decide(&tuning, tick, &obs);
            assert_eq!(decision.target.phase, NavPhase::Wander);
            assert!(!decision.input.firing);
            assert_eq!(decision.input.mouse_dy, 0.0);
            assert!(decision.input.keys.contains(&KeyCode::KeyW));
        }
    }
}
