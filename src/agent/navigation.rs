//! Agent navigation - picks the point the agent steers toward each frame

use crate::helpers::Vec2;
use crate::tuning::AgentTuning;

/// Navigation phases the agent can be in
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NavPhase {
    /// Outside the open area (wall corridors near spawn); head for the waypoint
    ReachOpenArea,
    /// In the open area with a live, positioned opponent
    Pursue,
    /// In the open area, opponent unknown or dead; circle the area center
    Wander,
}

/// Where to steer this frame and why
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct NavTarget {
    pub phase: NavPhase,
    pub point: Vec2,
}

/// Point on the wander circle for a given tick
pub fn wander_point(tuning: &AgentTuning, tick: u64) -> Vec2 {
    let t = tick as f32 * tuning.wander_rate;
    Vec2::new(
        tuning.wander_center.x + t.sin() * tuning.wander_radius,
        tuning.wander_center.y + t.cos() * tuning.wander_radius,
    )
}

/// Select the navigation target.
/// `opponent` is the opponent position, present only when it is alive and known.
pub fn select_target(tuning: &AgentTuning, tick: u64, pos: Vec2, opponent: Option<Vec2>) -> NavTarget {
    if !tuning.open_area.contains(pos) {
        return NavTarget {
            phase: NavPhase::ReachOpenArea,
            point: tuning.waypoint,
        };
    }
    match opponent {
        Some(point) => NavTarget {
            phase: NavPhase::Pursue,
            point,
        },
        None => NavTarget {
            phase: NavPhase::Wander,
            point: wander_point(tuning, tick),
        },
    }
}
