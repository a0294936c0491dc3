//! Idle/Running gate for the pass state machine.
//!
//! Our own edits make the host page mutate, which raises fresh pass
//! requests; any request arriving while a pass is `Running` must be dropped
//! outright, never queued, or the page and the filler feed each other
//! forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct PassGuard {
    running: AtomicBool,
}

impl PassGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_idle(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    /// Move Idle → Running; `None` when a pass is already running. The
    /// permit moves back to Idle on drop.
    pub fn try_begin(self: &Arc<Self>) -> Option<PassPermit> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(PassPermit {
                guard: self.clone(),
            })
        } else {
            None
        }
    }
}

pub struct PassPermit {
    guard: Arc<PassGuard>,
}

impl Drop for PassPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_while_running() {
        let guard = PassGuard::new();
        let permit = guard.try_begin().unwrap();
        assert!(!guard.is_idle());
        assert!(guard.try_begin().is_none());
        drop(permit);
        assert!(guard.is_idle());
        assert!(guard.try_begin().is_some());
    }
}
