//! Single-slot job registry.
//!
//! At most one generation may be building or rendering at a time. The
//! slot makes that invariant an explicit guard object instead of an
//! ambient flag, and holds under real concurrency.

use std::sync::atomic::{AtomicBool, Ordering};

/// A capacity-one job slot.
#[derive(Debug, Default)]
pub struct JobSlot {
    occupied: AtomicBool,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot. Returns false if a job is already in flight.
    pub fn try_acquire(&self) -> bool {
        self.occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Free the slot after a job finishes, successfully or not.
    pub fn release(&self) {
        self.occupied.store(false, Ordering::Release);
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }
}
