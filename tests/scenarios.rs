//! Runs every TOML scenario under tests/scenarios as part of `cargo test`

use std::path::Path;

use playtest::testing::{TestResult, discover_tests, parse_test_file, run_test};

#[test]
fn all_scenarios_pass() {
    let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scenarios");
    let tests = discover_tests(&base, None);
    assert!(!tests.is_empty(), "no scenarios found in {}", base.display());

    let mut failures = Vec::new();
    for path in &tests {
        let name = path.strip_prefix(&base).unwrap_or(path).display().to_string();
        let def = match parse_test_file(path) {
            Ok(def) => def,
            Err(e) => {
                failures.push(format!("{}: {}", name, e));
                continue;
            }
        };
        match run_test(&def) {
            TestResult::Pass { .. } => {}
            TestResult::Fail { error } => failures.push(format!("{} ({}): {}", name, def.name, error)),
            TestResult::Error { message } => failures.push(format!("{} ({}): error: {}", name, def.name, message)),
        }
    }

    assert!(failures.is_empty(), "{} scenario(s) failed:\n{}", failures.len(), failures.join("\n"));
}
