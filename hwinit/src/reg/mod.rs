//! Register Access Layer
//!
//! The only sanctioned way to touch a memory-mapped register. Every access is
//! volatile and fenced; on boards whose peripheral window is mapped cacheable
//! the covering line is invalidated before a load and flushed after a store.
//!
//! # Atomicity
//!
//! `read`/`write` are single loads/stores. The read-modify-write helpers
//! (`set`, `clear`, `set_n`, `clear_n`, `or`, `write_back`) each run under
//! one process-wide spin lock, so two drivers sharing a clock-gate register
//! never lose each other's update. A *sequence* of helpers is not atomic:
//! drivers hold their own lock around multi-step programming.
//!
//! Exclusive monitors (LDREX/STREX) are not usable on device memory, hence
//! the lock instead of atomic instructions.
//!
//! # Waiting
//!
//! | fn            | bound            | result                     |
//! |---------------|------------------|----------------------------|
//! | `wait`        | none             | returns when it holds      |
//! | `wait_for`    | `Duration`       | `false` on timeout         |
//! | `wait_signal` | [`Signal`]       | `false` on cancellation    |
//!
//! All three yield through [`sched::yield_now`] between polls.
//!
//! # Safety
//!
//! The free functions take raw addresses and are `unsafe`: `addr` must be a
//! mapped register (or ordinary memory) naturally aligned for `T`. Drivers
//! normally go through [`RegisterBlock`] which validates once at init.

pub mod block;
#[cfg(target_arch = "x86_64")]
pub mod port;

pub use block::{Register, RegisterBlock, RegisterError};

use core::fmt;
use core::ops::{BitAnd, BitOr, Not, Shl, Shr};
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use spin::Mutex;

use crate::cpu::{barriers, cache};
use crate::sched;
use crate::sync::Signal;
use crate::time::Deadline;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// Register word: u8, u16, u32 or u64.
pub trait RegisterValue:
    sealed::Sealed
    + Copy
    + Eq
    + fmt::Debug
    + fmt::LowerHex
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
    const BITS: u32;
}

macro_rules! register_value {
    ($($t:ty),*) => {
        $(
            impl RegisterValue for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const BITS: u32 = <$t>::BITS;
            }
        )*
    };
}

register_value!(u8, u16, u32, u64);

/// Serialises the read-modify-write helpers.
static RMW_LOCK: Mutex<()> = Mutex::new(());

/// Peripheral window mapped cacheable (set by the board).
static PERIPHERAL_CACHED: AtomicBool = AtomicBool::new(false);

/// Declare whether MMIO goes through the data cache.
pub fn set_peripheral_cached(cached: bool) {
    PERIPHERAL_CACHED.store(cached, Ordering::Relaxed);
}

pub fn peripheral_cached() -> bool {
    PERIPHERAL_CACHED.load(Ordering::Relaxed)
}

// ═══════════════════════════════════════════════════════════════════════════
// LOAD / STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Coherent volatile load.
///
/// # Safety
/// `addr` must be a valid, aligned address for `T`.
#[inline]
pub unsafe fn read<T: RegisterValue>(addr: usize) -> T {
    if peripheral_cached() {
        cache::invalidate_range(addr, core::mem::size_of::<T>());
    }
    let val = unsafe { ptr::read_volatile(addr as *const T) };
    barriers::rmb();
    val
}

/// Coherent volatile store, visible to the device on return.
///
/// # Safety
/// `addr` must be a valid, aligned address for `T`.
#[inline]
pub unsafe fn write<T: RegisterValue>(addr: usize, val: T) {
    barriers::wmb();
    unsafe { ptr::write_volatile(addr as *mut T, val) };
    if peripheral_cached() {
        cache::flush_range(addr, core::mem::size_of::<T>());
    }
    barriers::mb();
}

/// Copy one register into another.
///
/// # Safety
/// Both addresses must be valid, aligned addresses for `T`.
pub unsafe fn copy<T: RegisterValue>(dst: usize, src: usize) {
    unsafe { write(dst, read::<T>(src)) }
}

/// Run `f` on the current value and store the result, under the RMW lock.
#[inline]
unsafe fn modify<T: RegisterValue>(addr: usize, f: impl FnOnce(T) -> T) {
    let _guard = RMW_LOCK.lock();
    unsafe {
        let val = read::<T>(addr);
        write(addr, f(val));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BIT-FIELD HELPERS
// ═══════════════════════════════════════════════════════════════════════════

/// `(reg >> pos) & mask`
///
/// # Safety
/// See [`read`].
#[inline]
pub unsafe fn get<T: RegisterValue>(addr: usize, pos: u32, mask: T) -> T {
    debug_assert!(pos < T::BITS);
    (unsafe { read::<T>(addr) } >> pos) & mask
}

/// Single-bit test.
///
/// # Safety
/// See [`read`].
#[inline]
pub unsafe fn is_set<T: RegisterValue>(addr: usize, pos: u32) -> bool {
    unsafe { get::<T>(addr, pos, T::ONE) == T::ONE }
}

/// Set bit `pos`.
///
/// # Safety
/// See [`write`].
pub unsafe fn set<T: RegisterValue>(addr: usize, pos: u32) {
    debug_assert!(pos < T::BITS);
    unsafe { modify::<T>(addr, |r| r | (T::ONE << pos)) }
}

/// Clear bit `pos`.
///
/// # Safety
/// See [`write`].
pub unsafe fn clear<T: RegisterValue>(addr: usize, pos: u32) {
    debug_assert!(pos < T::BITS);
    unsafe { modify::<T>(addr, |r| r & !(T::ONE << pos)) }
}

/// Set or clear bit `pos`.
///
/// # Safety
/// See [`write`].
pub unsafe fn set_to<T: RegisterValue>(addr: usize, pos: u32, on: bool) {
    unsafe {
        if on {
            set::<T>(addr, pos)
        } else {
            clear::<T>(addr, pos)
        }
    }
}

/// Replace the field `mask << pos` with `val` (bits of `val` outside `mask`
/// are dropped).
///
/// # Safety
/// See [`write`].
pub unsafe fn set_n<T: RegisterValue>(addr: usize, pos: u32, mask: T, val: T) {
    debug_assert!(pos < T::BITS);
    unsafe { modify::<T>(addr, |r| (r & !(mask << pos)) | ((val & mask) << pos)) }
}

/// Clear the field `mask << pos`.
///
/// # Safety
/// See [`write`].
pub unsafe fn clear_n<T: RegisterValue>(addr: usize, pos: u32, mask: T) {
    debug_assert!(pos < T::BITS);
    unsafe { modify::<T>(addr, |r| r & !(mask << pos)) }
}

/// `reg |= val`
///
/// # Safety
/// See [`write`].
pub unsafe fn or<T: RegisterValue>(addr: usize, val: T) {
    unsafe { modify::<T>(addr, |r| r | val) }
}

/// Re-write the current value (latches write-1-to-clear status bits).
///
/// # Safety
/// See [`write`].
pub unsafe fn write_back<T: RegisterValue>(addr: usize) {
    unsafe { modify::<T>(addr, |r| r) }
}

// ═══════════════════════════════════════════════════════════════════════════
// WAITS
// ═══════════════════════════════════════════════════════════════════════════

/// Poll until `get(addr, pos, mask) == val`. Never gives up.
///
/// Only for conditions the hardware is guaranteed to reach.
///
/// # Safety
/// See [`read`].
pub unsafe fn wait<T: RegisterValue>(addr: usize, pos: u32, mask: T, val: T) {
    while unsafe { get::<T>(addr, pos, mask) } != val {
        sched::yield_now();
    }
}

/// Poll until the field matches or `timeout` elapses.
///
/// Returns `true` the first time the condition holds, `false` once the full
/// timeout has passed without it (never earlier).
///
/// # Safety
/// See [`read`].
pub unsafe fn wait_for<T: RegisterValue>(
    timeout: Duration,
    addr: usize,
    pos: u32,
    mask: T,
    val: T,
) -> bool {
    let deadline = Deadline::after(timeout);
    poll_until(
        || deadline.has_expired(),
        || unsafe { get::<T>(addr, pos, mask) } == val,
    )
}

/// Poll `holds` until it is true or `expired` was already true before the
/// poll. The last poll therefore happens at or after the deadline.
fn poll_until(mut expired: impl FnMut() -> bool, mut holds: impl FnMut() -> bool) -> bool {
    loop {
        let late = expired();
        if holds() {
            return true;
        }
        if late {
            return false;
        }
        sched::yield_now();
    }
}

/// Poll until the field matches (`true`) or `signal` fires (`false`).
///
/// The condition is checked before the signal, so a match observed together
/// with a shutdown request still reports success.
///
/// # Safety
/// See [`read`].
pub unsafe fn wait_signal<T: RegisterValue>(
    signal: &Signal,
    addr: usize,
    pos: u32,
    mask: T,
    val: T,
) -> bool {
    loop {
        if unsafe { get::<T>(addr, pos, mask) } == val {
            return true;
        }
        if signal.is_fired() {
            return false;
        }
        sched::yield_now();
    }
}
