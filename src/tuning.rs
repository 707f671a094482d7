//! Agent tuning settings (level metadata for the autonomous agent)
//!
//! The open-area rectangle and firing thresholds are hand-tuned to the
//! multiplayer arena. They default to the values in `constants` and can be
//! overridden per deployment from `config/agent_tuning.json`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::*;
use crate::helpers::Vec2;

/// Path to agent tuning config
pub const AGENT_TUNING_FILE: &str = "config/agent_tuning.json";

fn default_wander_center() -> Vec2 {
    WANDER_CENTER.into()
}
fn default_wander_radius() -> f32 {
    WANDER_RADIUS
}
fn default_wander_rate() -> f32 {
    WANDER_RATE
}

/// Axis-aligned "open area" test: `y > min_y && min_x < x < max_x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenArea {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
}

impl OpenArea {
    pub fn contains(&self, pos: Vec2) -> bool {
        pos.y > self.min_y && pos.x > self.min_x && pos.x < self.max_x
    }
}

impl Default for OpenArea {
    fn default() -> Self {
        Self {
            min_x: OPEN_AREA_MIN_X,
            max_x: OPEN_AREA_MAX_X,
            min_y: OPEN_AREA_MIN_Y,
        }
    }
}

/// Serializable tuning values for the combat agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTuning {
    pub open_area: OpenArea,
    pub waypoint: Vec2,
    #[serde(default = "default_wander_center")]
    pub wander_center: Vec2,
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f32,
    #[serde(default = "default_wander_rate")]
    pub wander_rate: f32,
    pub mouse_sensitivity: f32,
    pub max_mouse_delta: f32,
    pub strafe_cycle: u64,
    pub fire_angle_tolerance: f32,
    pub fire_max_range: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            open_area: OpenArea::default(),
            waypoint: OPEN_AREA_WAYPOINT.into(),
            wander_center: default_wander_center(),
            wander_radius: default_wander_radius(),
            wander_rate: default_wander_rate(),
            mouse_sensitivity: MOUSE_SENSITIVITY,
            max_mouse_delta: MAX_MOUSE_DELTA,
            strafe_cycle: STRAFE_CYCLE,
            fire_angle_tolerance: FIRE_ANGLE_TOLERANCE,
            fire_max_range: FIRE_MAX_RANGE,
        }
    }
}

impl AgentTuning {
    /// Strafe windows scaled to the configured cycle length.
    /// Returns (left_end, right_start, right_end).
    pub fn strafe_windows(&self) -> (u64, u64, u64) {
        if self.strafe_cycle == STRAFE_CYCLE {
            return (STRAFE_LEFT_END, STRAFE_RIGHT_START, STRAFE_RIGHT_END);
        }
        let quarter = self.strafe_cycle / 4;
        (quarter, quarter * 2, quarter * 3)
    }

    /// Load tuning from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_or_default(AGENT_TUNING_FILE)
    }

    pub fn load_or_default(path: &str) -> Self {
        if !std::path::Path::new(path).exists() {
            return Self::default();
        }
        match load_agent_tuning_from_file(path) {
            Ok(tuning) => {
                info!("Loaded agent tuning from {}", path);
                tuning
            }
            Err(err) => {
                warn!("{}, using default agent tuning", err);
                Self::default()
            }
        }
    }
}

pub fn load_agent_tuning_from_file(path: &str) -> Result<AgentTuning, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_area_bounds_are_exclusive() {
        let area = OpenArea::default();
        assert!(area.contains(Vec2::new(16.0, 12.0)));
        assert!(!area.contains(Vec2::new(8.0, 12.0)));
        assert!(!area.contains(Vec2::new(24.0, 12.0)));
        assert!(!area.contains(Vec2::new(16.0, 6.0)));
        assert!(!area.contains(Vec2::new(3.0, 2.0)));
    }

    #[test]
    fn test_default_strafe_windows() {
        assert_eq!(AgentTuning::default().strafe_windows(), (20, 40, 60));
        let tuning = AgentTuning {
            strafe_cycle: 40,
            ..Default::default()
        };
        assert_eq!(tuning.strafe_windows(), (10, 20, 30));
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let json = r#"{
            "open_area": { "min_x": 4.0, "max_x": 28.0, "min_y": 3.0 },
            "waypoint": { "x": 10.0, "y": 10.0 },
            "mouse_sensitivity": 0.003,
            "max_mouse_delta": 150.0,
            "strafe_cycle": 80,
            "fire_angle_tolerance": 0.44,
            "fire_max_range": 20.0
        }"#;
        let tuning: AgentTuning = serde_json::from_str(json).unwrap();
        assert_eq!(tuning.open_area.min_x, 4.0);
        assert_eq!(tuning.wander_radius, WANDER_RADIUS);
        assert_eq!(tuning.wander_center, Vec2::new(16.0, 16.0));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tuning = AgentTuning::load_or_default("config/does_not_exist.json");
        assert_eq!(tuning, AgentTuning::default());
    }
}
