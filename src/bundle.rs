//! Instrumentation bundle appended to the client's entry script
//!
//! The bundle is the browser-side rendition of the hook surface, supervisor,
//! agent and HUD patch. It is rendered once at startup from a JavaScript
//! template with the agent tuning substituted in, then shared read-only by
//! every request.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::constants::{BUNDLE_CONTENT_TYPE, DEFAULT_ENTRY_PATH, HOOK_NAMESPACE};
use crate::tuning::AgentTuning;

const DEFAULT_TEMPLATE: &str = include_str!("../assets/test_hooks.js");

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Failed to read bundle template {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Unresolved placeholder {{{{{0}}}}} in bundle template")]
    Unresolved(String),
}

/// Rendered bundle plus where it goes
#[derive(Debug, Clone)]
pub struct InstrumentationBundle {
    pub content: Vec<u8>,
    pub content_type: &'static str,
    /// Request path of the entry script that receives the bundle
    pub target_path: String,
}

impl InstrumentationBundle {
    /// Render the built-in template
    pub fn from_tuning(tuning: &AgentTuning) -> Result<Self, BundleError> {
        Self::from_template(DEFAULT_TEMPLATE, tuning)
    }

    /// Render a template from disk (`--bundle FILE`)
    pub fn load(path: impl AsRef<Path>, tuning: &AgentTuning) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|source| BundleError::Read {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded bundle template from {}", path.display());
        Self::from_template(&template, tuning)
    }

    pub fn from_template(template: &str, tuning: &AgentTuning) -> Result<Self, BundleError> {
        let content = render_template(template, tuning)?;
        Ok(Self {
            content: content.into_bytes(),
            content_type: BUNDLE_CONTENT_TYPE,
            target_path: DEFAULT_ENTRY_PATH.to_string(),
        })
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.target_path = if path.starts_with('/') { path } else { format!("/{}", path) };
        self
    }

    /// Whether a request path names the entry script. Query strings are
    /// already stripped by the router.
    pub fn targets(&self, path: &str) -> bool {
        path == self.target_path
    }

    /// Original bytes followed by the bundle. The input is never modified.
    pub fn instrument(&self, original: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(original.len() + self.content.len());
        out.extend_from_slice(original);
        out.extend_from_slice(&self.content);
        out
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn placeholders(tuning: &AgentTuning) -> Vec<(&'static str, String)> {
    let (left_end, right_start, right_end) = tuning.strafe_windows();
    vec![
        ("HOOK_NAMESPACE", HOOK_NAMESPACE.to_string()),
        ("OPEN_AREA_MIN_X", tuning.open_area.min_x.to_string()),
        ("OPEN_AREA_MAX_X", tuning.open_area.max_x.to_string()),
        ("OPEN_AREA_MIN_Y", tuning.open_area.min_y.to_string()),
        ("WAYPOINT_X", tuning.waypoint.x.to_string()),
        ("WAYPOINT_Y", tuning.waypoint.y.to_string()),
        ("WANDER_X", tuning.wander_center.x.to_string()),
        ("WANDER_Y", tuning.wander_center.y.to_string()),
        ("WANDER_RADIUS", tuning.wander_radius.to_string()),
        ("WANDER_RATE", tuning.wander_rate.to_string()),
        ("MOUSE_SENSITIVITY", tuning.mouse_sensitivity.to_string()),
        ("MAX_MOUSE_DELTA", tuning.max_mouse_delta.to_string()),
        ("STRAFE_CYCLE", tuning.strafe_cycle.max(1).to_string()),
        ("STRAFE_LEFT_END", left_end.to_string()),
        ("STRAFE_RIGHT_START", right_start.to_string()),
        ("STRAFE_RIGHT_END", right_end.to_string()),
        ("FIRE_ANGLE_TOLERANCE", tuning.fire_angle_tolerance.to_string()),
        ("FIRE_MAX_RANGE", tuning.fire_max_range.to_string()),
    ]
}

fn render_template(template: &str, tuning: &AgentTuning) -> Result<String, BundleError> {
    let mut out = template.to_string();
    for (key, value) in placeholders(tuning) {
        out = out.replace(&format!("{{{{{}}}}}", key), &value);
    }
    if let Some(start) = out.find("{{") {
        let rest = &out[start + 2..];
        let name = rest.split("}}").next().unwrap_or(rest).to_string();
        return Err(BundleError::Unresolved(name));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_renders() {
        let bundle = InstrumentationBundle::from_tuning(&AgentTuning::default()).unwrap();
        let text = String::from_utf8(bundle.content.clone()).unwrap();
        assert!(text.contains("window._test = {"));
        assert!(text.contains("minY: 6"));
        assert!(text.contains("mouseSensitivity: 0.003"));
        assert!(text.contains("window._startAutoP1"));
        assert!(!text.contains("{{"));
        assert_eq!(bundle.content_type, "application/javascript");
        assert_eq!(bundle.target_path, "/src/main.js");
    }

    #[test]
    fn test_tuning_overrides_reach_the_script() {
        let mut tuning = AgentTuning::default();
        tuning.fire_max_range = 12.5;
        tuning.strafe_cycle = 40;
        let bundle = InstrumentationBundle::from_tuning(&tuning).unwrap();
        let text = String::from_utf8(bundle.content).unwrap();
        assert!(text.contains("range: 12.5"));
        assert!(text.contains("cycle: 40, leftEnd: 10, rightStart: 20, rightEnd: 30"));
    }

    #[test]
    fn test_instrument_appends_after_original() {
        let bundle = InstrumentationBundle::from_template("\n;hooks();", &AgentTuning::default()).unwrap();
        let original = b"console.log('game');";
        let out = bundle.instrument(original);
        assert!(out.starts_with(original));
        assert_eq!(out.len(), original.len() + bundle.len());
        assert!(out.ends_with(b";hooks();"));
        // Empty entry script still gets the hooks
        assert_eq!(bundle.instrument(b""), bundle.content);
    }

    #[test]
    fn test_unknown_placeholder_is_rejected() {
        let err = InstrumentationBundle::from_template("x = {{NOPE}};", &AgentTuning::default()).unwrap_err();
        assert!(matches!(err, BundleError::Unresolved(ref name) if name == "NOPE"));
    }

    #[test]
    fn test_target_path_normalized() {
        let bundle = InstrumentationBundle::from_template("", &AgentTuning::default())
            .unwrap()
            .with_target_path("app/index.js");
        assert!(bundle.targets("/app/index.js"));
        assert!(!bundle.targets("/src/main.js"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.js");
        std::fs::write(&path, "range={{FIRE_MAX_RANGE}}").unwrap();
        let bundle = InstrumentationBundle::load(&path, &AgentTuning::default()).unwrap();
        assert_eq!(bundle.content, b"range=20");
        assert!(InstrumentationBundle::load(dir.path().join("missing.js"), &AgentTuning::default()).is_err());
    }

    // Stand-in for a submission's entry script: top-level `let` bindings
    // that never appear on `window`, and a loadLevel with no return value.
    const GAME: &str = r#"
var window = globalThis;
var warnings = [];
var console = { log() {}, error() {}, warn(msg) { warnings.push(String(msg)); } };
const GameState = { TITLE: 'TITLE', LEVEL_INTRO: 'LEVEL_INTRO', PLAYING: 'PLAYING', LOBBY: 'LOBBY', MP_PLAYING: 'MP_PLAYING' };
let gameState = GameState.TITLE;
let currentLevelIndex = 0;
let introCharIndex = 7;
let player = { health: 100, alive: true, angle: Math.PI / 2, pos: { x: 16, y: 12 } };
let mpState = { remotePlayer: { alive: true, pos: { x: 16, y: 20 } } };
let input = { _keysDown: new Set(), _mouseDeltaX: 0, _mouseDeltaY: 0, _mouseDown: false, _mousePressed: false };
let frames = [];
let sent = [];
function requestAnimationFrame(cb) { frames.push(cb); }
function loadLevel(index) { currentLevelIndex = index; player.health = 100; }
let updateMultiplayer = function (dt) {
    sent.push({ keys: Array.from(input._keysDown), fire: input._mouseDown });
};
let gameLoop = function (timestamp) { throw new Error('boom at ' + timestamp); };
"#;

    /// Evaluate the instrumented entry script, then `script`, returning the
    /// string `script` evaluates to.
    fn run_in_page(script: &str) -> String {
        let bundle = InstrumentationBundle::from_tuning(&AgentTuning::default()).unwrap();
        let page = String::from_utf8(bundle.instrument(GAME.as_bytes())).unwrap();
        let rt = rquickjs::Runtime::new().unwrap();
        let ctx = rquickjs::Context::full(&rt).unwrap();
        ctx.with(|ctx| {
            let _: rquickjs::Value = ctx.eval(page).unwrap();
            ctx.eval::<String, _>(script).unwrap()
        })
    }

    #[test]
    fn test_load_level_enters_intro() {
        let out = run_in_page(
            "window._test.loadLevel(1);
             const s = window._test.getState();
             [s.gameState, s.currentLevelIndex, introCharIndex].join(',')",
        );
        assert_eq!(out, "LEVEL_INTRO,1,0");
    }

    #[test]
    fn test_lexical_game_loop_is_supervised() {
        let out = run_in_page(
            "gameLoop(5);
             [String(window._loopError).split(' | ')[0], frames.length, frames[0] === gameLoop].join(',')",
        );
        assert_eq!(out, "boom at 5,1,true");
    }

    #[test]
    fn test_missing_entry_point_warns() {
        let out = run_in_page("warnings.join(';')");
        assert!(out.contains("renderMultiplayer not found"));
        assert!(!out.contains("gameLoop"));
        assert!(!out.contains("updateMultiplayer"));
    }

    #[test]
    fn test_stopped_agent_releases_input() {
        let out = run_in_page(
            "gameState = GameState.MP_PLAYING;
             window._startAutoP1();
             for (let i = 0; i < 10; i++) updateMultiplayer(1 / 60);
             const firing = sent[sent.length - 1];
             window._stopAutoP1();
             updateMultiplayer(1 / 60);
             const after = sent[sent.length - 1];
             [firing.fire, firing.keys.includes('KeyW'), after.fire, after.keys.length, input._mousePressed].join(',')",
        );
        assert_eq!(out, "true,true,false,0,false");
    }
}
