//! Scenario execution engine
//!
//! Each scenario boots a fresh instrumented reference client on its own
//! current-thread runtime. Suspending hooks are spawned onto a `LocalSet`
//! and make progress between frames, exactly as they would between
//! animation frames in a browser.

use serde_json::{Value, json};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tokio::task::{JoinHandle, LocalSet};
use tracing::debug;

use crate::client::{Client, ClientMessage, Game, Player};
use crate::constants::{HOOK_NAMESPACE, PLAYER_MAX_HEALTH};
use crate::helpers::Vec2;
use crate::hooks::{ASYNC_HOOKS, HookError, HookSurface};
use crate::instrument::{InstrumentOptions, instrument};
use crate::sim::{FaultKind, OpponentConfig, OpponentScript, Pose, SimGame};
use crate::tuning::AgentTuning;

use super::assertions::{AssertionError, CapturedEvent, check_sequence, check_state};
use super::input::{ScriptedSteps, apply_input};
use super::parser::{FaultKindDef, StartMode, StateSource, Step, TestDefinition, TestSetup};

/// Result of running a test
#[derive(Debug)]
pub enum TestResult {
    Pass { frames: u64 },
    Fail { error: AssertionError },
    Error { message: String },
}

/// Suspending hook call still in flight
struct PendingCall {
    name: String,
    allow_error: bool,
    handle: JoinHandle<Result<Value, HookError>>,
}

/// Events seen so far, plus cursors into the sources they come from
#[derive(Default)]
struct EventCapture {
    events: Vec<CapturedEvent>,
    sim_seen: usize,
    sent_seen: usize,
    recoveries_seen: u64,
}

struct Scenario {
    client: Client,
    game: Rc<SimGame>,
    hooks: HookSurface,
    frame: u64,
    capture: EventCapture,
    pending: Vec<PendingCall>,
}

/// Run a single test and return the result
pub fn run_test(test: &TestDefinition) -> TestResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            return TestResult::Error {
                message: format!("Failed to start runtime: {}", e),
            };
        }
    };
    LocalSet::new().block_on(&runtime, run_scenario(test))
}

async fn run_scenario(test: &TestDefinition) -> TestResult {
    let mut scenario = match Scenario::setup(&test.setup) {
        Ok(scenario) => scenario,
        Err(message) => return TestResult::Error { message },
    };

    let mut steps = ScriptedSteps::from_steps(&test.steps);
    steps.set_max_frame(test.frame_count());
    let max_frame = steps.max_frame;

    let mut assertions = test.expect.state.clone();
    assertions.sort_by_key(|a| a.after_frame);
    let mut assertions = assertions.into_iter().peekable();

    for frame in 0..=max_frame {
        while let Some(assertion) = assertions.next_if(|a| a.after_frame == frame) {
            let state = match scenario.read(assertion.source) {
                Ok(state) => state,
                Err(message) => return TestResult::Error { message },
            };
            if let Err(error) = check_state(&assertion, &state) {
                return TestResult::Fail {
                    error: AssertionError {
                        message: format!("After frame {}: {}", frame, error.message),
                        ..error
                    },
                };
            }
        }

        for step in steps.take(frame) {
            if let Err(message) = scenario.run_step(&step) {
                return TestResult::Error { message };
            }
        }
        settle().await;
        if let Err(message) = scenario.collect().await {
            return TestResult::Error { message };
        }

        if frame == max_frame {
            break;
        }
        scenario.advance();
        settle().await;
        if let Err(message) = scenario.collect().await {
            return TestResult::Error { message };
        }
    }

    if let Err(error) = check_sequence(&test.expect.sequence, &scenario.capture.events) {
        return TestResult::Fail { error };
    }

    TestResult::Pass { frames: max_frame }
}

/// Let spawned hook calls run up to their next suspension point
async fn settle() {
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
}

fn bare_hook_name(name: &str) -> &str {
    name.strip_prefix(HOOK_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
}

impl Scenario {
    fn setup(setup: &TestSetup) -> Result<Self, String> {
        let (mut client, game) = SimGame::client(setup.seed);

        if setup.mode == StartMode::Match {
            let local = setup.player.map(|p| Pose {
                pos: Vec2::new(p.x, p.y),
                angle: p.angle,
            });
            let opponent = setup
                .opponent
                .as_ref()
                .map(|o| OpponentConfig {
                    spawn: Vec2::new(o.x, o.y),
                    script: o
                        .patrol_to
                        .map_or(OpponentScript::Stationary, |[x, y]| OpponentScript::Patrol {
                            to: Vec2::new(x, y),
                        }),
                    health: o.health.unwrap_or(PLAYER_MAX_HEALTH),
                })
                .unwrap_or_default();
            game.configure_match(local, opponent);
        }

        let options = InstrumentOptions {
            tuning: AgentTuning::load(),
            hud_patch: setup.hud_patch,
            supervisor: setup.supervisor,
        };
        let hooks = instrument(&mut client, options).map_err(|e| format!("Failed to instrument client: {}", e))?;
        client.start().map_err(|e| format!("Failed to start client: {}", e))?;

        match setup.mode {
            StartMode::Match => game.enter_match(&mut client.context().borrow_mut()),
            StartMode::Menu => {
                if let Some(level) = setup.level {
                    if !hooks.load_level(level) {
                        return Err(format!("Level {} not found ({} levels)", level, game.level_count()));
                    }
                }
                if let Some(p) = setup.player {
                    client.context().borrow_mut().player = Some(Player {
                        pos: Vec2::new(p.x, p.y),
                        angle: p.angle,
                        health: PLAYER_MAX_HEALTH,
                        alive: true,
                    });
                }
            }
        }

        Ok(Self {
            client,
            game,
            hooks,
            frame: 0,
            capture: EventCapture::default(),
            pending: Vec::new(),
        })
    }

    fn run_step(&mut self, step: &Step) -> Result<(), String> {
        if let Some(name) = &step.call {
            if ASYNC_HOOKS.contains(&bare_hook_name(name)) {
                let hooks = self.hooks.clone();
                let (call, args) = (name.clone(), step.args.clone());
                let handle = tokio::task::spawn_local(async move { hooks.invoke_async(&call, &args).await });
                self.pending.push(PendingCall {
                    name: bare_hook_name(name).to_string(),
                    allow_error: step.allow_error,
                    handle,
                });
            } else {
                match self.hooks.invoke(name, &step.args) {
                    Ok(_) => {}
                    Err(e) if step.allow_error => {
                        debug!("{} failed as allowed: {}", name, e);
                        self.record(format!("HookError:{}", bare_hook_name(name)));
                    }
                    Err(e) => return Err(format!("Frame {}: {} failed: {}", self.frame, name, e)),
                }
            }
        }

        if let Some(fault) = &step.fault {
            let on_frame = fault.on_frame.unwrap_or(self.frame + 1);
            let kind = match fault.kind {
                FaultKindDef::Error => FaultKind::Error(fault.message.clone()),
                FaultKindDef::Panic => FaultKind::Panic(fault.message.clone()),
                FaultKindDef::Render => FaultKind::RenderError(fault.message.clone()),
            };
            self.game.faults().inject(on_frame, kind);
        }

        if let Some(input) = &step.input {
            apply_input(&mut self.client.context().borrow_mut().input, input);
        }
        Ok(())
    }

    /// Run the next frame. A panic escaping an unsupervised loop stops it.
    fn advance(&mut self) {
        self.frame += 1;
        let client = &mut self.client;
        if catch_unwind(AssertUnwindSafe(|| client.step())).is_err() {
            self.record("LoopStopped");
        }
    }

    fn record(&mut self, event_type: impl Into<String>) {
        let event = CapturedEvent::new(self.frame, event_type);
        self.capture.events.push(event);
    }

    /// Pick up everything that happened since the last call
    async fn collect(&mut self) -> Result<(), String> {
        let sim_events = self.game.events();
        for event in &sim_events[self.capture.sim_seen..] {
            self.capture.events.push(CapturedEvent::new(event.frame(), event.kind()));
        }
        self.capture.sim_seen = sim_events.len();

        let sent = self.game.network().sent_kinds();
        for kind in &sent[self.capture.sent_seen..] {
            self.record(format!("Sent:{}", kind));
        }
        self.capture.sent_seen = sent.len();

        let recoveries = self.hooks.errors().recoveries();
        for _ in self.capture.recoveries_seen..recoveries {
            self.record("LoopError");
        }
        self.capture.recoveries_seen = recoveries;

        let mut still_pending = Vec::new();
        for call in std::mem::take(&mut self.pending) {
            if !call.handle.is_finished() {
                still_pending.push(call);
                continue;
            }
            match call.handle.await {
                Ok(Ok(_)) => self.record(format!("Resolved:{}", call.name)),
                Ok(Err(e)) if call.allow_error => {
                    debug!("{} failed as allowed: {}", call.name, e);
                    self.record(format!("HookError:{}", call.name));
                }
                Ok(Err(e)) => return Err(format!("Frame {}: {} failed: {}", self.frame, call.name, e)),
                Err(e) => return Err(format!("Frame {}: {} task failed: {}", self.frame, call.name, e)),
            }
        }
        self.pending = still_pending;
        Ok(())
    }

    fn read(&self, source: StateSource) -> Result<Value, String> {
        let hook = |name: &str| self.hooks.invoke(name, &[]).map_err(|e| format!("{} failed: {}", name, e));
        match source {
            StateSource::State => hook("getState"),
            StateSource::MpStatus => hook("_getMpStatus"),
            StateSource::Network => {
                let network = self.game.network();
                let sent = network.sent();
                let last_input = sent.iter().rev().find_map(|m| match m {
                    ClientMessage::Input { keys, fire, .. } => Some((keys.len(), *fire)),
                    _ => None,
                });
                Ok(json!({
                    "connectCalls": network.connect_calls(),
                    "hits": network.hits(),
                    "roomCode": network.room_code(),
                    "sent": network.sent_kinds(),
                    "inputs": sent.iter().filter(|m| m.kind() == "input").count(),
                    "lastInputKeys": last_input.map(|(keys, _)| keys),
                    "lastInputFire": last_input.map(|(_, fire)| fire),
                }))
            }
            StateSource::Supervisor => {
                let errors = self.hooks.errors();
                Ok(json!({
                    "phase": format!("{:?}", errors.phase()),
                    "recoveries": errors.recoveries(),
                    "lastFrame": errors.last_error().map(|e| e.frame),
                    "loopError": errors.loop_error(),
                    "looping": self.client.is_looping(),
                }))
            }
        }
    }
}
