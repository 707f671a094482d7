//! Name-based hook dispatch: JSON arguments in, JSON values out

use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use super::HookSurface;
use crate::client::NetworkError;
use crate::constants::HOOK_NAMESPACE;

/// Hook names as exposed on the client's global scope
pub const HOOK_NAMES: &[&str] = &[
    "loadLevel",
    "skipToPlaying",
    "getState",
    "GameState",
    "goToLobby",
    "hostGame",
    "joinGame",
    "ready",
    "getLobbyState",
    "getRoomCode",
    "isPointerLocked",
    "restartLoop",
    "getCanvasData",
    "_startAutoP1",
    "_stopAutoP1",
    "_getMpStatus",
];

/// Hooks that suspend until a network exchange has been sent
pub const ASYNC_HOOKS: &[&str] = &["hostGame", "joinGame"];

#[derive(Debug, Error)]
pub enum HookError {
    #[error("unknown hook: {0}")]
    UnknownHook(String),
    #[error("bad arguments to {hook}: {reason}")]
    BadArguments { hook: String, reason: String },
    #[error("{0} suspends; call it through invoke_async")]
    Suspending(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Strip an optional `_test.` prefix
fn hook_name(name: &str) -> &str {
    name.strip_prefix(HOOK_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
}

fn bad_args(hook: &str, reason: impl Into<String>) -> HookError {
    HookError::BadArguments {
        hook: hook.to_string(),
        reason: reason.into(),
    }
}

/// Level index argument. A negative integer names no level and yields None,
/// which callers treat like any other out-of-range index.
fn index_arg(hook: &str, args: &[Value]) -> Result<Option<usize>, HookError> {
    let value = args.first().ok_or_else(|| bad_args(hook, "missing level index"))?;
    match (value.as_u64(), value.as_i64()) {
        (Some(n), _) => Ok(Some(n as usize)),
        (None, Some(_)) => Ok(None),
        _ => Err(bad_args(hook, format!("expected an integer, got {}", value))),
    }
}

fn string_arg<'a>(hook: &str, args: &'a [Value]) -> Result<&'a str, HookError> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| bad_args(hook, "expected a string argument"))
}

impl HookSurface {
    /// Call a synchronous hook by name
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, HookError> {
        let name = hook_name(name);
        let value = match name {
            "loadLevel" => {
                match index_arg(name, args)? {
                    Some(index) => {
                        self.load_level(index);
                    }
                    None => warn!("loadLevel({}) rejected: no such level", args[0]),
                }
                Value::Null
            }
            "skipToPlaying" => {
                self.skip_to_playing();
                Value::Null
            }
            "getState" => serde_json::to_value(self.get_state())?,
            "GameState" => json!(self.game_state_names()),
            "goToLobby" => {
                self.go_to_lobby();
                Value::Null
            }
            "ready" => {
                self.ready()?;
                Value::Null
            }
            "getLobbyState" => serde_json::to_value(self.get_lobby_state())?,
            "getRoomCode" => json!(self.get_room_code()),
            "isPointerLocked" => json!(self.is_pointer_locked()),
            "restartLoop" => {
                self.restart_loop();
                Value::Null
            }
            "getCanvasData" => json!(self.get_canvas_data()),
            "_startAutoP1" => {
                self.start_auto_p1();
                Value::Null
            }
            "_stopAutoP1" => {
                self.stop_auto_p1();
                Value::Null
            }
            "_getMpStatus" => serde_json::to_value(self.get_mp_status())?,
            _ if ASYNC_HOOKS.contains(&name) => return Err(HookError::Suspending(name.to_string())),
            _ => return Err(HookError::UnknownHook(name.to_string())),
        };
        Ok(value)
    }

    /// Call any hook by name, awaiting suspending ones
    pub async fn invoke_async(&self, name: &str, args: &[Value]) -> Result<Value, HookError> {
        let name = hook_name(name);
        match name {
            "hostGame" => self.host_game().await?,
            "joinGame" => self.join_game(string_arg(name, args)?).await?,
            _ => return self.invoke(name, args),
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentHandle;
    use crate::sim::SimGame;
    use crate::supervisor::ErrorSlot;

    fn surface() -> HookSurface {
        let (client, _game) = SimGame::client(9);
        HookSurface::install(&client, AgentHandle::new(), ErrorSlot::new()).unwrap()
    }

    #[test]
    fn test_invoke_by_name_with_namespace_prefix() {
        let hooks = surface();
        hooks.invoke("_test.skipToPlaying", &[]).unwrap();
        let state = hooks.invoke("getState", &[]).unwrap();
        assert_eq!(state["gameState"], json!("PLAYING"));
        let names = hooks.invoke("_test.GameState", &[]).unwrap();
        assert_eq!(names.as_array().map(Vec::len), Some(8));
    }

    #[test]
    fn test_agent_toggles_through_invoke() {
        let hooks = surface();
        hooks.invoke("_startAutoP1", &[]).unwrap();
        hooks.invoke("_startAutoP1", &[]).unwrap();
        assert_eq!(hooks.invoke("_getMpStatus", &[]).unwrap()["autoP1Active"], json!(true));
        hooks.invoke("_stopAutoP1", &[]).unwrap();
        assert_eq!(hooks.invoke("_getMpStatus", &[]).unwrap()["autoP1Active"], json!(false));
    }

    #[test]
    fn test_invoke_errors() {
        let hooks = surface();
        assert!(matches!(hooks.invoke("teleport", &[]), Err(HookError::UnknownHook(_))));
        assert!(matches!(
            hooks.invoke("loadLevel", &[json!("two")]),
            Err(HookError::BadArguments { .. })
        ));
        assert!(matches!(hooks.invoke("loadLevel", &[]), Err(HookError::BadArguments { .. })));
        assert!(matches!(
            hooks.invoke("loadLevel", &[json!(1.5)]),
            Err(HookError::BadArguments { .. })
        ));
        assert!(matches!(hooks.invoke("hostGame", &[]), Err(HookError::Suspending(_))));
    }

    #[test]
    fn test_negative_level_index_is_ignored() {
        let hooks = surface();
        let before = hooks.invoke("getState", &[]).unwrap();
        assert_eq!(hooks.invoke("loadLevel", &[json!(-1)]).unwrap(), Value::Null);
        assert_eq!(hooks.invoke("_test.loadLevel", &[json!(i64::MIN)]).unwrap(), Value::Null);
        assert_eq!(hooks.invoke("getState", &[]).unwrap(), before);
    }

    #[test]
    fn test_every_name_dispatches() {
        let hooks = surface();
        for name in HOOK_NAMES {
            if ASYNC_HOOKS.contains(name) {
                continue;
            }
            let args = if *name == "loadLevel" { vec![json!(0)] } else { vec![] };
            match hooks.invoke(name, &args) {
                Ok(_) | Err(HookError::Network(_)) => {}
                Err(err) => panic!("{} failed: {}", name, err),
            }
        }
    }
}
