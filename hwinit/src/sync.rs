//! Synchronization Primitives
//!
//! Small pieces shared by the register layer and the board glue.
//!
//! # Design Notes
//!
//! Runtime hooks (console sink, clock source, scheduler yield, fatal handler)
//! are plain function pointers installed once by the board and read on every
//! use. They live behind `spin::RwLock` so installing one from the boot path
//! never races a reader on another core.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::RwLock;

// ═══════════════════════════════════════════════════════════════════════════
// HOOK
// ═══════════════════════════════════════════════════════════════════════════

/// A replaceable function-pointer slot.
///
/// `F` is expected to be a `fn` type; the value is copied out on `get()` so the
/// lock is never held while the hook runs.
pub struct Hook<F: Copy> {
    slot: RwLock<Option<F>>,
}

impl<F: Copy> Hook<F> {
    /// Create an empty hook.
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Install (or replace) the hook.
    pub fn install(&self, f: F) {
        *self.slot.write() = Some(f);
    }

    /// Remove the hook, restoring the built-in default.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    /// Current hook, if any.
    #[inline]
    pub fn get(&self) -> Option<F> {
        *self.slot.read()
    }

    pub fn is_installed(&self) -> bool {
        self.slot.read().is_some()
    }
}

impl<F: Copy> Default for Hook<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SIGNAL (cancellation)
// ═══════════════════════════════════════════════════════════════════════════

/// One-shot cancellation flag for `wait_signal` style loops.
///
/// A driver's receive/transmit loop holds a reference and the shutdown path
/// calls [`Signal::fire`]. Firing is sticky until [`Signal::reset`].
#[derive(Debug)]
pub struct Signal {
    fired: AtomicBool,
}

impl Signal {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Request cancellation.
    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Re-arm after a shutdown so the driver can be restarted.
    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
