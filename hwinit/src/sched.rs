//! Cooperative yield point.
//!
//! Register polls call [`yield_now`] between reads. On a cooperative
//! single-core runtime the board installs the runtime's task switch here so a
//! spinning driver doesn't starve everything else; without a hook it is a
//! `spin_loop` hint.

use crate::sync::Hook;

static YIELD: Hook<fn()> = Hook::new();

/// Install the runtime's yield function.
pub fn set_yield_hook(hook: fn()) {
    YIELD.install(hook);
}

/// Give other tasks a chance to run.
#[inline]
pub fn yield_now() {
    match YIELD.get() {
        Some(hook) => hook(),
        None => core::hint::spin_loop(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static YIELDS: AtomicUsize = AtomicUsize::new(0);

    fn count_yield() {
        YIELDS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn test_installed_hook_runs_on_yield() {
        set_yield_hook(count_yield);
        let before = YIELDS.load(Ordering::Relaxed);
        yield_now();
        yield_now();
        assert!(YIELDS.load(Ordering::Relaxed) >= before + 2);
    }
}
