//! Armed/disarmed latch for render lifecycle hooks.
//!
//! Hooks for one render attempt may be armed exactly once; arming again
//! while a render is in flight is a rejected no-op. The latch is reset
//! only after the completion event has been handled.

use std::sync::atomic::{AtomicBool, Ordering};

/// Two-state latch: disarmed → armed.
#[derive(Debug, Default)]
pub struct RenderLatch {
    armed: AtomicBool,
}

impl RenderLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the latch. Returns false if it is already armed.
    pub fn try_arm(&self) -> bool {
        self.armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Disarm after the completion event has been fully handled.
    pub fn reset(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_arm_is_rejected() {
        let latch = RenderLatch::new();
        assert!(latch.try_arm());
        assert!(!latch.try_arm());
        assert!(latch.is_armed());
    }

    #[test]
    fn test_reset_allows_rearming() {
        let latch = RenderLatch::new();
        assert!(latch.try_arm());
        latch.reset();
        assert!(!latch.is_armed());
        assert!(latch.try_arm());
    }
}
