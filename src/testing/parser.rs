//! TOML scenario file parsing

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::client::KeyCode;

/// Complete scenario definition from a TOML file
#[derive(Debug, Deserialize)]
pub struct TestDefinition {
    pub name: String,
    pub description: Option<String>,
    pub setup: TestSetup,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expect: TestExpectations,
}

/// Where the client starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Main menu, loop running
    #[default]
    Menu,
    /// Straight into a running multiplayer match
    Match,
}

/// Scenario setup
#[derive(Debug, Deserialize)]
pub struct TestSetup {
    #[serde(default)]
    pub mode: StartMode,
    #[serde(default)]
    pub seed: u64,
    /// Level loaded through `loadLevel` before the first frame
    pub level: Option<usize>,
    /// Minimum number of frames to run
    pub frames: Option<u64>,
    #[serde(default = "default_true")]
    pub hud_patch: bool,
    #[serde(default = "default_true")]
    pub supervisor: bool,
    pub player: Option<Placement>,
    pub opponent: Option<OpponentDef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub angle: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpponentDef {
    pub x: f32,
    pub y: f32,
    pub health: Option<f32>,
    /// Patrol between the spawn and this point
    pub patrol_to: Option<[f32; 2]>,
}

/// Something done before the frame after `frame`. Exactly one of
/// `call`, `fault` or `input` is expected per step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub frame: u64,
    /// Hook name, e.g. `_startAutoP1` or `hostGame`
    pub call: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
    /// A hook error is recorded as an event instead of failing the run
    #[serde(default)]
    pub allow_error: bool,
    pub fault: Option<FaultDef>,
    pub input: Option<InputSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaultDef {
    pub kind: FaultKindDef,
    #[serde(default = "default_fault_message")]
    pub message: String,
    /// Frame the fault fires on; defaults to the next frame
    pub on_frame: Option<u64>,
}

fn default_fault_message() -> String {
    "injected fault".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKindDef {
    Error,
    Panic,
    Render,
}

/// Human input; fields left out keep their previous value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputSnapshot {
    pub keys: Option<Vec<KeyCode>>,
    pub mouse_dx: Option<f32>,
    pub mouse_dy: Option<f32>,
    pub fire: Option<bool>,
}

/// Expected outcomes
#[derive(Debug, Default, Deserialize)]
pub struct TestExpectations {
    #[serde(default)]
    pub sequence: Vec<ExpectedEvent>,
    /// State assertions at different frames (`[[expect.state]]`)
    #[serde(default)]
    pub state: Vec<StateAssertion>,
}

/// Expected event in sequence
#[derive(Debug, Deserialize)]
pub struct ExpectedEvent {
    pub event: String,
    pub frame_min: Option<u64>,
    pub frame_max: Option<u64>,
}

/// Which hook result a state assertion reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSource {
    /// `getState()`
    #[default]
    State,
    /// `_getMpStatus()`
    MpStatus,
    /// Loopback server counters
    Network,
    /// Supervisor phase and recovery count
    Supervisor,
}

/// Checks run after `after_frame` frames, before that frame's steps
#[derive(Debug, Clone, Deserialize)]
pub struct StateAssertion {
    pub after_frame: u64,
    #[serde(default)]
    pub source: StateSource,
    #[serde(default)]
    pub checks: Vec<String>,
}

impl TestDefinition {
    /// Last frame the scenario needs
    pub fn frame_count(&self) -> u64 {
        let steps = self.steps.iter().map(|s| {
            let fault_frame = s.fault.as_ref().and_then(|f| f.on_frame).unwrap_or(0);
            s.frame.max(fault_frame)
        });
        let states = self.expect.state.iter().map(|s| s.after_frame);
        let sequence = self.expect.sequence.iter().filter_map(|e| e.frame_max);
        steps
            .chain(states)
            .chain(sequence)
            .chain(self.setup.frames)
            .max()
            .filter(|&n| n > 0)
            .unwrap_or(60)
    }
}

/// Parse a scenario file from path
pub fn parse_test_file(path: &Path) -> Result<TestDefinition, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}
