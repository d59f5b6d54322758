//! Monotonic time.
//!
//! `now_ns()` reads the architecture counter and scales it to nanoseconds:
//!
//! - aarch64: generic timer (`CNTVCT_EL0` / `CNTFRQ_EL0`)
//! - arm (bare metal): generic timer via CP15, at the board rate else `CNTFRQ`
//! - x86_64: TSC, at the board-configured rate, else CPUID, else 1 GHz
//! - riscv64: `rdtime`, at the board timebase (default 1 MHz)
//! - others: a counter advancing 1 µs per read
//!
//! A board (or a hosted test) can replace all of that with [`set_source`].

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

use crate::sync::Hook;

/// Nanosecond clock override.
pub type ClockSource = fn() -> u64;

static SOURCE: Hook<ClockSource> = Hook::new();

/// Counter frequency in Hz; 0 means "not configured".
static TICK_HZ: AtomicU64 = AtomicU64::new(0);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Install a nanosecond clock, replacing the architecture counter.
pub fn set_source(source: ClockSource) {
    SOURCE.install(source);
}

/// Return to the architecture counter.
pub fn clear_source() {
    SOURCE.clear();
}

/// Set the architecture counter frequency (TSC rate, RISC-V timebase).
pub fn set_tick_frequency(hz: u64) {
    TICK_HZ.store(hz, Ordering::Relaxed);
}

/// Configured counter frequency, 0 if none was set.
pub fn tick_frequency() -> u64 {
    TICK_HZ.load(Ordering::Relaxed)
}

#[inline]
fn ticks_to_ns(ticks: u64, hz: u64) -> u64 {
    if hz == 0 {
        return ticks;
    }
    (ticks as u128 * NANOS_PER_SEC / hz as u128) as u64
}

/// Monotonic nanoseconds since an arbitrary epoch.
pub fn now_ns() -> u64 {
    match SOURCE.get() {
        Some(source) => source(),
        None => arch::now_ns(),
    }
}

#[cfg(target_arch = "aarch64")]
mod arch {
    pub fn now_ns() -> u64 {
        let ticks: u64;
        let freq: u64;
        unsafe {
            core::arch::asm!("isb", "mrs {}, cntvct_el0", out(reg) ticks, options(nostack, preserves_flags));
            core::arch::asm!("mrs {}, cntfrq_el0", out(reg) freq, options(nomem, nostack, preserves_flags));
        }
        super::ticks_to_ns(ticks, freq)
    }
}

#[cfg(target_arch = "x86_64")]
mod arch {
    use core::sync::atomic::Ordering;

    const ASSUMED_TSC_HZ: u64 = 1_000_000_000;

    pub fn now_ns() -> u64 {
        let mut hz = super::TICK_HZ.load(Ordering::Relaxed);
        if hz == 0 {
            hz = crate::cpu::tsc::tsc_frequency_cpuid().unwrap_or(ASSUMED_TSC_HZ);
            super::TICK_HZ.store(hz, Ordering::Relaxed);
        }
        super::ticks_to_ns(crate::cpu::tsc::read_tsc(), hz)
    }
}

#[cfg(target_arch = "riscv64")]
mod arch {
    use core::sync::atomic::Ordering;

    const DEFAULT_TIMEBASE_HZ: u64 = 1_000_000;

    pub fn now_ns() -> u64 {
        let ticks: u64;
        unsafe {
            core::arch::asm!("rdtime {}", out(reg) ticks, options(nomem, nostack));
        }
        let hz = match super::TICK_HZ.load(Ordering::Relaxed) {
            0 => DEFAULT_TIMEBASE_HZ,
            hz => hz,
        };
        super::ticks_to_ns(ticks, hz)
    }
}

#[cfg(all(target_arch = "arm", bare_metal))]
mod arch {
    use core::sync::atomic::Ordering;

    pub fn now_ns() -> u64 {
        let lo: u32;
        let hi: u32;
        unsafe {
            core::arch::asm!(
                "isb",
                "mrrc p15, 1, {lo}, {hi}, c14",
                lo = out(reg) lo,
                hi = out(reg) hi,
                options(nostack, preserves_flags)
            );
        }
        let ticks = ((hi as u64) << 32) | lo as u64;

        // CNTFRQ is only as good as the firmware that programmed it
        let hz = match super::TICK_HZ.load(Ordering::Relaxed) {
            0 => {
                let freq: u32;
                unsafe {
                    core::arch::asm!("mrc p15, 0, {}, c14, c0, 0", out(reg) freq, options(nomem, nostack, preserves_flags));
                }
                freq as u64
            }
            hz => hz,
        };
        super::ticks_to_ns(ticks, hz)
    }
}

#[cfg(not(any(
    target_arch = "aarch64",
    target_arch = "x86_64",
    target_arch = "riscv64",
    all(target_arch = "arm", bare_metal)
)))]
mod arch {
    use core::sync::atomic::{AtomicU64, Ordering};

    static FALLBACK: AtomicU64 = AtomicU64::new(0);

    pub fn now_ns() -> u64 {
        FALLBACK.fetch_add(1_000, Ordering::Relaxed)
    }
}

/// Point in time after which a bounded wait gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u64,
    timeout: u64,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let timeout = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        Self {
            start: now_ns(),
            timeout,
        }
    }

    /// Nanoseconds since the deadline was armed.
    pub fn elapsed_ns(&self) -> u64 {
        now_ns().saturating_sub(self.start)
    }

    /// True once the full timeout has passed.
    pub fn has_expired(&self) -> bool {
        self.elapsed_ns() >= self.timeout
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use std::sync::OnceLock;
    use std::time::Instant;

    fn std_clock() -> u64 {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
    }

    /// Hosted tests measure time with the host clock; the raw counter's
    /// rate is unknown under a hypervisor.
    pub(crate) fn install_std_clock() {
        set_source(std_clock);
    }

    #[test]
    fn test_ticks_to_ns_scaling() {
        assert_eq!(ticks_to_ns(24_000_000, 24_000_000), 1_000_000_000);
        assert_eq!(ticks_to_ns(1, 1_000_000), 1_000);
        assert_eq!(ticks_to_ns(u64::MAX / 2, 2_000_000_000), (u64::MAX / 2) / 2);
        assert_eq!(ticks_to_ns(42, 0), 42);
    }

    #[test]
    fn test_zero_deadline_expires_immediately() {
        install_std_clock();
        let d = Deadline::after(Duration::ZERO);
        assert!(d.has_expired());
    }

    #[test]
    fn test_long_deadline_not_expired() {
        install_std_clock();
        let d = Deadline::after(Duration::from_secs(3600));
        assert!(!d.has_expired());
    }

    #[test]
    fn test_clock_is_monotonic() {
        install_std_clock();
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }
}
