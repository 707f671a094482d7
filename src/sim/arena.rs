//! Level database and movement rules of the reference client

use crate::client::KeyCode;
use crate::constants::*;
use crate::helpers::{Vec2, normalize_angle};
use std::collections::BTreeSet;

/// Index of the multiplayer arena in the default level list
pub const ARENA_LEVEL: usize = 2;

/// Single level definition
#[derive(Clone, Debug)]
pub struct LevelData {
    pub name: String,
    pub intro: String,
    pub spawn: Vec2,
    pub spawn_angle: f32,
    /// Objective counter shown on the HUD; None in the arena
    pub objective: Option<Objective>,
    pub multiplayer: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Objective {
    pub label: String,
    pub current: u32,
    pub total: u32,
}

/// Database of all levels
#[derive(Clone, Debug)]
pub struct LevelDatabase {
    pub levels: Vec<LevelData>,
}

impl Default for LevelDatabase {
    fn default() -> Self {
        Self::default_levels()
    }
}

impl LevelDatabase {
    /// Two campaign levels and the multiplayer arena
    pub fn default_levels() -> Self {
        let objective = |label: &str, total| Objective {
            label: label.to_string(),
            current: 0,
            total,
        };
        Self {
            levels: vec![
                LevelData {
                    name: "Boot Camp".to_string(),
                    intro: "Sector 1. Learn to move and shoot.".to_string(),
                    spawn: Vec2::new(4.0, 4.0),
                    spawn_angle: 0.0,
                    objective: Some(objective("Targets", 3)),
                    multiplayer: false,
                },
                LevelData {
                    name: "Foundry".to_string(),
                    intro: "Sector 2. The furnaces are still running.".to_string(),
                    spawn: Vec2::new(6.0, 28.0),
                    spawn_angle: -std::f32::consts::FRAC_PI_2,
                    objective: Some(objective("Switches", 2)),
                    multiplayer: false,
                },
                LevelData {
                    name: "Arena".to_string(),
                    intro: "Deathmatch.".to_string(),
                    spawn: Vec2::new(3.0, 2.0),
                    spawn_angle: 0.0,
                    objective: None,
                    multiplayer: true,
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LevelData> {
        self.levels.get(index)
    }
}

/// Position and facing of a player
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub pos: Vec2,
    pub angle: f32,
}

/// Turn by the mouse delta, then walk/strafe by the held keys.
/// Client prediction and the loopback server both step through this.
pub fn step_pose(pose: Pose, keys: &BTreeSet<KeyCode>, mouse_dx: f32, dt: f32) -> Pose {
    let angle = normalize_angle(pose.angle + mouse_dx * MOUSE_SENSITIVITY);
    let (sin, cos) = angle.sin_cos();
    let mut dir = Vec2::default();
    if keys.contains(&KeyCode::KeyW) {
        dir.x += cos;
        dir.y += sin;
    }
    if keys.contains(&KeyCode::KeyS) {
        dir.x -= cos;
        dir.y -= sin;
    }
    // Left of facing is (sin, -cos) with y pointing down the map
    if keys.contains(&KeyCode::KeyA) {
        dir.x += sin;
        dir.y -= cos;
    }
    if keys.contains(&KeyCode::KeyD) {
        dir.x -= sin;
        dir.y += cos;
    }
    let len = (dir.x * dir.x + dir.y * dir.y).sqrt();
    let mut pos = pose.pos;
    if len > 0.0 {
        pos.x += dir.x / len * PLAYER_MOVE_SPEED * dt;
        pos.y += dir.y / len * PLAYER_MOVE_SPEED * dt;
    }
    Pose {
        pos: clamp_to_arena(pos),
        angle,
    }
}

pub fn clamp_to_arena(pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x.clamp(ARENA_MARGIN, ARENA_SIZE - ARENA_MARGIN),
        pos.y.clamp(ARENA_MARGIN, ARENA_SIZE - ARENA_MARGIN),
    )
}

/// Whether a shot from `shooter` lands on a target at `target`
pub fn shot_hits(shooter: Pose, target: Vec2) -> bool {
    let diff = crate::helpers::shortest_angle_diff(shooter.angle, shooter.pos.bearing_to(target));
    diff.abs() < WEAPON_HIT_CONE && shooter.pos.distance(target) < WEAPON_RANGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_forward_and_strafe() {
        let pose = Pose {
            pos: Vec2::new(10.0, 10.0),
            angle: 0.0,
        };
        let forward = step_pose(pose, &BTreeSet::from([KeyCode::KeyW]), 0.0, 1.0);
        assert!((forward.pos.x - 13.0).abs() < 1e-5);
        assert!((forward.pos.y - 10.0).abs() < 1e-5);

        let left = step_pose(pose, &BTreeSet::from([KeyCode::KeyA]), 0.0, 1.0);
        assert!((left.pos.y - 7.0).abs() < 1e-5);

        // Diagonal is not faster than straight
        let diagonal = step_pose(pose, &BTreeSet::from([KeyCode::KeyW, KeyCode::KeyD]), 0.0, 1.0);
        assert!((diagonal.pos.distance(pose.pos) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_turning_stays_normalized() {
        let mut pose = Pose {
            pos: Vec2::new(16.0, 16.0),
            angle: 0.0,
        };
        for _ in 0..500 {
            pose = step_pose(pose, &BTreeSet::new(), 150.0, 0.016);
            assert!(pose.angle > -PI && pose.angle <= PI);
        }
    }

    #[test]
    fn test_clamped_to_arena() {
        let pose = Pose {
            pos: Vec2::new(1.5, 1.5),
            angle: PI,
        };
        let moved = step_pose(pose, &BTreeSet::from([KeyCode::KeyW]), 0.0, 1.0);
        assert_eq!(moved.pos.x, ARENA_MARGIN);
    }

    #[test]
    fn test_arena_is_the_multiplayer_level() {
        let db = LevelDatabase::default_levels();
        assert_eq!(db.len(), 3);
        let arena = db.get(ARENA_LEVEL).unwrap();
        assert!(arena.multiplayer);
        assert!(arena.objective.is_none());
        assert!(db.get(3).is_none());
    }
}
