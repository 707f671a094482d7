//! Fault injection for exercising the loop supervisor

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::client::{FrameError, FrameResult};

#[derive(Clone, Debug, PartialEq)]
pub enum FaultKind {
    /// Update returns an error
    Error(String),
    /// Update panics
    Panic(String),
    /// Render fails after drawing the frame
    RenderError(String),
}

impl FaultKind {
    pub fn message(&self) -> &str {
        match self {
            FaultKind::Error(m) | FaultKind::Panic(m) | FaultKind::RenderError(m) => m,
        }
    }
}

/// Faults keyed by the frame they fire on; each fires once
#[derive(Clone, Debug, Default)]
pub struct FaultQueue {
    pending: Rc<RefCell<BTreeMap<u64, Vec<FaultKind>>>>,
}

impl FaultQueue {
    pub fn inject(&self, frame: u64, kind: FaultKind) {
        self.pending.borrow_mut().entry(frame).or_default().push(kind);
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().values().map(Vec::len).sum()
    }

    fn take(&self, frame: u64, render: bool) -> Option<FaultKind> {
        let mut pending = self.pending.borrow_mut();
        let faults = pending.get_mut(&frame)?;
        let index = faults
            .iter()
            .position(|f| matches!(f, FaultKind::RenderError(_)) == render)?;
        let fault = faults.remove(index);
        if faults.is_empty() {
            pending.remove(&frame);
        }
        Some(fault)
    }

    /// Fire any update fault scheduled for `frame`
    pub fn check_update(&self, frame: u64) -> FrameResult {
        match self.take(frame, false) {
            Some(FaultKind::Panic(message)) => panic!("{}", message),
            Some(fault) => Err(FrameError::new(fault.message())),
            None => Ok(()),
        }
    }

    /// Fire any render fault scheduled for `frame`
    pub fn check_render(&self, frame: u64) -> FrameResult {
        match self.take(frame, true) {
            Some(fault) => Err(FrameError::new(fault.message())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_fire_once_on_their_frame() {
        let faults = FaultQueue::default();
        faults.inject(3, FaultKind::Error("boom".to_string()));
        faults.inject(3, FaultKind::RenderError("late".to_string()));
        assert!(faults.check_update(2).is_ok());
        assert_eq!(faults.check_update(3).unwrap_err().message, "boom");
        assert!(faults.check_update(3).is_ok());
        assert_eq!(faults.pending(), 1);
        assert_eq!(faults.check_render(3).unwrap_err().message, "late");
        assert_eq!(faults.pending(), 0);
    }
}
