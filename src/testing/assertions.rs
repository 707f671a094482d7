//! Assertion checking for scenario expectations

use serde_json::Value;

use super::parser::{ExpectedEvent, StateAssertion};

/// Error when an assertion fails
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for AssertionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n    Expected: {}\n    Actual: {}", self.message, self.expected, self.actual)
    }
}

/// Captured event with timing info
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    pub frame: u64,
    /// `Fire`, `LoopError`, `Sent:create_room`, `Resolved:hostGame`, ...
    pub event_type: String,
}

impl CapturedEvent {
    pub fn new(frame: u64, event_type: impl Into<String>) -> Self {
        Self {
            frame,
            event_type: event_type.into(),
        }
    }
}

/// Check that expected events occur in order (other events may interleave)
pub fn check_sequence(expected: &[ExpectedEvent], captured: &[CapturedEvent]) -> Result<(), AssertionError> {
    let mut captured_idx = 0;

    for (i, exp) in expected.iter().enumerate() {
        let found = captured[captured_idx..]
            .iter()
            .enumerate()
            .find(|(_, cap)| cap.event_type == exp.event);

        match found {
            Some((offset, cap)) => {
                if let Some(min) = exp.frame_min {
                    if cap.frame < min {
                        return Err(AssertionError {
                            message: format!("Event #{} '{}' occurred too early", i + 1, exp.event),
                            expected: format!("frame >= {}", min),
                            actual: format!("frame {}", cap.frame),
                        });
                    }
                }
                if let Some(max) = exp.frame_max {
                    if cap.frame > max {
                        return Err(AssertionError {
                            message: format!("Event #{} '{}' occurred too late", i + 1, exp.event),
                            expected: format!("frame <= {}", max),
                            actual: format!("frame {}", cap.frame),
                        });
                    }
                }
                captured_idx += offset + 1;
            }
            None => {
                return Err(AssertionError {
                    message: format!("Event #{} '{}' not found", i + 1, exp.event),
                    expected: format!("'{}' event in sequence", exp.event),
                    actual: format!(
                        "events after position {}: {:?}",
                        captured_idx,
                        captured[captured_idx..].iter().map(|e| &e.event_type).collect::<Vec<_>>()
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Parse a check string into (path, operator, value)
fn parse_check(check: &str) -> Option<(&str, &str, &str)> {
    // Try operators in order of specificity (>= before >, etc.)
    for op in &["~=", ">=", "<=", "!=", "=", ">", "<"] {
        if let Some(idx) = check.find(op) {
            let path = check[..idx].trim();
            let value = check[idx + op.len()..].trim();
            return Some((path, op, value));
        }
    }
    None
}

/// Look up a dotted path (`a.b.0`) in a JSON value
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Check state assertions against a hook result
pub fn check_state(assertion: &StateAssertion, state: &Value) -> Result<(), AssertionError> {
    for check in &assertion.checks {
        let (path, operator, expected_value) = parse_check(check).ok_or_else(|| AssertionError {
            message: format!("Invalid check syntax: {}", check),
            expected: "format: 'field = value', 'field > value' or 'field ~= text'".to_string(),
            actual: check.clone(),
        })?;

        let actual = lookup(state, path).ok_or_else(|| AssertionError {
            message: format!("Field '{}' not found", path),
            expected: format!("field '{}'", path),
            actual: state.to_string(),
        })?;

        check_value(check, path, actual, operator, expected_value)?;
    }

    Ok(())
}

fn check_value(check: &str, path: &str, actual: &Value, operator: &str, expected: &str) -> Result<(), AssertionError> {
    let fail = || AssertionError {
        message: format!("Check failed: {}", check),
        expected: format!("{} {} {}", path, operator, expected),
        actual: actual.to_string(),
    };

    if operator == "~=" {
        let needle = expected.trim_matches('"');
        return match actual.as_str() {
            Some(text) if text.contains(needle) => Ok(()),
            _ => Err(fail()),
        };
    }

    if let Some(actual) = actual.as_f64() {
        return check_float_comparison(path, actual, operator, expected);
    }

    // Null, booleans and strings support only equality
    let expected_json: Value = match expected {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        s => Value::String(s.trim_matches('"').to_string()),
    };
    let pass = match operator {
        "=" => *actual == expected_json,
        "!=" => *actual != expected_json,
        _ => {
            return Err(AssertionError {
                message: format!("Operator '{}' needs a number: {}", operator, check),
                expected: "number".to_string(),
                actual: actual.to_string(),
            });
        }
    };
    if pass { Ok(()) } else { Err(fail()) }
}

/// Check float comparison with operator
fn check_float_comparison(path: &str, actual: f64, operator: &str, expected_str: &str) -> Result<(), AssertionError> {
    let value: f64 = expected_str.trim().parse().map_err(|_| AssertionError {
        message: format!("Invalid value for {}", path),
        expected: "number".to_string(),
        actual: expected_str.to_string(),
    })?;

    let pass = match operator {
        ">=" => actual >= value,
        "<=" => actual <= value,
        ">" => actual > value,
        "<" => actual < value,
        "=" => (actual - value).abs() < 0.01,
        "!=" => (actual - value).abs() >= 0.01,
        _ => false,
    };

    if !pass {
        return Err(AssertionError {
            message: format!("Check failed: {} {} {} (actual: {:.2})", path, operator, expected_str, actual),
            expected: format!("{} {} {}", path, operator, value),
            actual: format!("{:.2}", actual),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::parser::StateSource;
    use serde_json::json;

    fn assertion(checks: &[&str]) -> StateAssertion {
        StateAssertion {
            after_frame: 0,
            source: StateSource::State,
            checks: checks.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_state_checks() {
        let state = json!({
            "gameState": "MP_PLAYING",
            "autoP1Tick": 100,
            "loopError": null,
            "lastError": "boom | at frame 3",
            "nested": { "list": [1, 2] }
        });
        let ok = assertion(&[
            "gameState = \"MP_PLAYING\"",
            "autoP1Tick = 100",
            "autoP1Tick >= 50",
            "loopError = null",
            "lastError ~= boom",
            "lastError != null",
            "nested.list.1 = 2",
        ]);
        assert!(check_state(&ok, &state).is_ok());

        assert!(check_state(&assertion(&["autoP1Tick < 100"]), &state).is_err());
        assert!(check_state(&assertion(&["missing = 1"]), &state).is_err());
        assert!(check_state(&assertion(&["gameState > 3"]), &state).is_err());
        assert!(check_state(&assertion(&["no operator"]), &state).is_err());
    }

    #[test]
    fn test_sequence_in_order() {
        let captured = vec![
            CapturedEvent::new(1, "MatchStart"),
            CapturedEvent::new(4, "Fire"),
            CapturedEvent::new(9, "LoopError"),
            CapturedEvent::new(20, "Fire"),
        ];
        let expect = |event: &str, frame_max: Option<u64>| ExpectedEvent {
            event: event.to_string(),
            frame_min: None,
            frame_max,
        };
        assert!(check_sequence(&[expect("Fire", None), expect("LoopError", None), expect("Fire", None)], &captured).is_ok());
        assert!(check_sequence(&[expect("LoopError", None), expect("MatchStart", None)], &captured).is_err());
        assert!(check_sequence(&[expect("LoopError", Some(5))], &captured).is_err());
    }
}
