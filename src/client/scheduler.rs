//! Per-frame scheduling primitive (the headless `requestAnimationFrame`)

use std::cell::Cell;
use std::rc::Rc;

/// Shared handle for requesting the next frame.
/// Clones refer to the same request flag, so the game loop, the supervisor
/// and the hook surface all schedule through one primitive.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    requested: Rc<Cell<bool>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for the loop callback to run on the next frame.
    /// Multiple requests before that frame collapse into one.
    pub fn request_frame(&self) {
        self.requested.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }

    /// Consume the pending request, returning whether there was one
    pub fn take_request(&self) -> bool {
        self.requested.replace(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_collapse_and_are_shared() {
        let scheduler = FrameScheduler::new();
        let other = scheduler.clone();
        assert!(!scheduler.take_request());
        other.request_frame();
        other.request_frame();
        assert!(scheduler.is_requested());
        assert!(scheduler.take_request());
        assert!(!scheduler.take_request());
    }
}
