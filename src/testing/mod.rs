//! Scenario testing system for deterministic end-to-end runs
//!
//! Provides infrastructure for running scripted hook calls, faults and
//! human input against an instrumented headless client, then checking the
//! hook surface's view of the result.

pub mod assertions;
pub mod input;
pub mod parser;
pub mod runner;

pub use assertions::{AssertionError, CapturedEvent, check_sequence, check_state};
pub use input::{ScriptedSteps, apply_input};
pub use parser::{
    ExpectedEvent, InputSnapshot, StartMode, StateAssertion, StateSource, Step, TestDefinition, TestExpectations,
    TestSetup, parse_test_file,
};
pub use runner::{TestResult, run_test};

use std::fs;
use std::path::{Path, PathBuf};

/// Default path for test scenarios
pub const SCENARIOS_DIR: &str = "tests/scenarios";

/// All `.toml` files under `base` whose relative path contains `filter`, sorted
pub fn discover_tests(base: &Path, filter: Option<&str>) -> Vec<PathBuf> {
    let mut tests = Vec::new();
    discover_tests_recursive(base, base, filter, &mut tests);
    tests.sort();
    tests
}

fn discover_tests_recursive(base: &Path, current: &Path, filter: Option<&str>, tests: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(current) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            discover_tests_recursive(base, &path, filter, tests);
        } else if path.extension().map(|e| e == "toml").unwrap_or(false) {
            if let Some(f) = filter {
                let rel = path.strip_prefix(base).unwrap_or(&path).to_string_lossy();
                if !rel.contains(f) {
                    continue;
                }
            }
            tests.push(path);
        }
    }
}
