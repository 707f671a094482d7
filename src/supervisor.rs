//! Loop supervisor - keeps the frame loop alive across uncaught errors
//!
//! Wraps the composed frame callback. An error returned from, or a panic
//! raised inside, one frame is captured into the shared error slot, logged,
//! followed by a guarded recovery render, and the next frame is requested
//! through the same scheduler the game uses.
//!
//! Panics carry the stack of the panic site: a process-wide panic hook,
//! chained in front of whatever hook was installed before, stashes a
//! backtrace in a thread-local that the supervisor picks up after the
//! unwind is caught.

use chrono::{DateTime, Local};
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::Once;
use tracing::{error, info, warn};

use crate::client::{FrameError, FrameScheduler, LoopFn, PatchRegistry, SharedContext};

/// Name the supervisor registers its loop patch under
pub const SUPERVISOR_PATCH: &str = "loop-supervisor";

thread_local! {
    static PANIC_STACK: Cell<Option<String>> = const { Cell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            PANIC_STACK.set(Some(Backtrace::force_capture().to_string()));
            previous(info);
        }));
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    Running,
    /// Last frame failed; cleared by the next frame unconditionally
    Recovering,
}

/// Most recent error captured from the frame loop
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub message: String,
    pub stack: String,
    pub frame: u64,
    pub captured_at: DateTime<Local>,
}

impl CapturedError {
    /// `"<message> | <stack>"`, the form exposed through the hook surface
    pub fn report(&self) -> String {
        format!("{} | {}", self.message, self.stack)
    }
}

#[derive(Debug)]
struct SupervisorState {
    phase: SupervisorPhase,
    recoveries: u64,
    last_error: Option<CapturedError>,
}

/// Shared error slot: single writer (the supervisor), many readers
#[derive(Debug, Clone)]
pub struct ErrorSlot {
    state: Rc<RefCell<SupervisorState>>,
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(SupervisorState {
                phase: SupervisorPhase::Running,
                recoveries: 0,
                last_error: None,
            })),
        }
    }
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_error(&self) -> Option<CapturedError> {
        self.state.borrow().last_error.clone()
    }

    /// Report string of the last captured error, if any
    pub fn loop_error(&self) -> Option<String> {
        self.state.borrow().last_error.as_ref().map(CapturedError::report)
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.state.borrow().phase
    }

    pub fn recoveries(&self) -> u64 {
        self.state.borrow().recoveries
    }

    fn record(&self, error: CapturedError) {
        let mut state = self.state.borrow_mut();
        state.phase = SupervisorPhase::Recovering;
        state.recoveries += 1;
        state.last_error = Some(error);
    }

    fn begin_frame(&self) {
        self.state.borrow_mut().phase = SupervisorPhase::Running;
    }
}

pub struct LoopSupervisor {
    ctx: SharedContext,
    scheduler: FrameScheduler,
    slot: ErrorSlot,
}

impl LoopSupervisor {
    pub fn new(ctx: SharedContext, scheduler: FrameScheduler, slot: ErrorSlot) -> Self {
        install_panic_hook();
        Self { ctx, scheduler, slot }
    }

    /// Register the supervisor as a loop patch
    pub fn register(self, registry: &mut PatchRegistry) {
        registry.wrap_loop(SUPERVISOR_PATCH, move |original| self.wrap(original));
    }

    pub fn wrap(self, mut original: LoopFn) -> LoopFn {
        Box::new(move |timestamp| {
            self.slot.begin_frame();
            PANIC_STACK.take();
            let outcome = match catch_unwind(AssertUnwindSafe(|| original(timestamp))) {
                Ok(result) => result,
                Err(payload) => {
                    let mut err = FrameError::from_panic(payload);
                    if let Some(stack) = PANIC_STACK.take() {
                        err.stack = stack;
                    }
                    Err(err)
                }
            };
            if let Err(err) = outcome {
                self.recover(err);
            }
            Ok(())
        })
    }

    fn recover(&self, err: FrameError) {
        let frame = self.ctx.try_borrow().map(|c| c.clock.frame).unwrap_or_default();
        error!("Game loop error on frame {}: {}", frame, err.message);
        self.slot.record(CapturedError {
            message: err.message,
            stack: err.stack,
            frame,
            captured_at: Local::now(),
        });

        // Show whatever the failed frame managed to draw
        let rendered = catch_unwind(AssertUnwindSafe(|| match self.ctx.try_borrow_mut() {
            Ok(mut ctx) => {
                ctx.display.present();
                true
            }
            Err(_) => false,
        }));
        if !matches!(rendered, Ok(true)) {
            warn!("Recovery render skipped on frame {}", frame);
        }

        self.scheduler.request_frame();
        info!("Frame loop rescheduled after error (recovery #{})", self.slot.recoveries());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FaultKind, SimGame, heartbeat_color};

    fn supervised_client(seed: u64) -> (crate::client::Client, Rc<SimGame>, ErrorSlot) {
        let (mut client, game) = SimGame::client(seed);
        let slot = ErrorSlot::new();
        let mut registry = PatchRegistry::new();
        LoopSupervisor::new(client.context(), client.scheduler(), slot.clone()).register(&mut registry);
        client.apply_patches(registry).unwrap();
        client.start().unwrap();
        (client, game, slot)
    }

    #[test]
    fn test_error_is_captured_and_loop_continues() {
        let (mut client, game, slot) = supervised_client(3);
        game.faults().inject(2, FaultKind::Error("update exploded".to_string()));
        assert!(client.step());
        assert!(slot.loop_error().is_none());
        assert!(client.step());
        let report = slot.loop_error().unwrap();
        assert!(report.contains("update exploded"));
        assert_eq!(slot.phase(), SupervisorPhase::Recovering);
        assert_eq!(slot.last_error().unwrap().frame, 2);
        // Next frame still runs
        assert!(client.step());
        assert_eq!(slot.phase(), SupervisorPhase::Running);
        assert_eq!(client.context().borrow().clock.frame, 3);
    }

    #[test]
    fn test_panic_is_captured() {
        let (mut client, game, slot) = supervised_client(3);
        game.faults().inject(1, FaultKind::Panic("index out of bounds".to_string()));
        assert!(client.step());
        assert!(slot.loop_error().unwrap().starts_with("index out of bounds | "));
        assert!(client.is_looping());
        assert!(client.step());
        assert_eq!(slot.recoveries(), 1);
    }

    #[test]
    fn test_captured_stacks_point_at_the_failure() {
        let (mut client, game, slot) = supervised_client(3);
        game.faults().inject(1, FaultKind::Error("returned".to_string()));
        game.faults().inject(2, FaultKind::Panic("raised".to_string()));

        client.step();
        let returned = slot.last_error().unwrap();
        assert!(!returned.stack.contains("disabled backtrace"));
        assert!(returned.stack.contains("check_update"));

        client.step();
        let raised = slot.last_error().unwrap();
        assert_eq!(raised.message, "raised");
        assert!(!raised.stack.contains("disabled backtrace"));
        // Taken at the panic site, not where the unwind was caught
        assert!(raised.stack.contains("check_update"));
    }

    #[test]
    fn test_slot_is_overwritten_not_accumulated() {
        let (mut client, game, slot) = supervised_client(3);
        game.faults().inject(1, FaultKind::Error("first".to_string()));
        game.faults().inject(2, FaultKind::Error("second".to_string()));
        client.step();
        client.step();
        assert!(slot.loop_error().unwrap().starts_with("second"));
        assert_eq!(slot.recoveries(), 2);
    }

    #[test]
    fn test_recovery_render_presents_back_buffer() {
        let (mut client, game, _slot) = supervised_client(3);
        client.step();
        game.faults().inject(2, FaultKind::RenderError("after draw".to_string()));
        client.step();
        let ctx = client.context();
        let ctx = ctx.borrow();
        assert_eq!(*ctx.display.visible.get_pixel(0, 0), heartbeat_color(2));
    }
}
