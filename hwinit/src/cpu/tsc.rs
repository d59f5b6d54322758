//! TSC (Time Stamp Counter) bindings.
//!
//! # Frequency
//! Boards that know their TSC rate put it in the board config. Otherwise
//! `tsc_frequency_cpuid()` asks CPUID leaf 0x15 (crystal ratio), falling back
//! to leaf 0x16 (nominal base MHz). Hypervisors such as QEMU microvm expose
//! leaf 0x15 only with `+invtsc`.
//!
//! # Safety
//! TSC reads are always safe. Requires invariant TSC for timekeeping.

/// Read TSC (non-serializing).
///
/// Fast but may be reordered with surrounding instructions.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_tsc() -> u64 {
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

/// Read TSC after all prior loads completed.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_tsc_serialized() -> u64 {
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_mm_lfence();
        core::arch::x86_64::_rdtsc()
    }
}

/// TSC frequency in Hz as reported by CPUID, if the CPU reports it.
#[cfg(target_arch = "x86_64")]
pub fn tsc_frequency_cpuid() -> Option<u64> {
    use core::arch::x86_64::__cpuid;

    #[allow(unused_unsafe)]
    let max_leaf = unsafe { __cpuid(0) }.eax;

    if max_leaf >= 0x15 {
        #[allow(unused_unsafe)]
        let leaf = unsafe { __cpuid(0x15) };
        // EAX denominator, EBX numerator, ECX crystal Hz
        if leaf.eax != 0 && leaf.ebx != 0 && leaf.ecx != 0 {
            return Some(leaf.ecx as u64 * leaf.ebx as u64 / leaf.eax as u64);
        }
    }

    if max_leaf >= 0x16 {
        #[allow(unused_unsafe)]
        let leaf = unsafe { __cpuid(0x16) };
        let mhz = (leaf.eax & 0xFFFF) as u64;
        if mhz != 0 {
            return Some(mhz * 1_000_000);
        }
    }

    None
}

/// Stub for non-x86_64 targets.
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn read_tsc() -> u64 {
    0
}

/// Stub for non-x86_64 targets.
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn read_tsc_serialized() -> u64 {
    0
}

/// Stub for non-x86_64 targets.
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn tsc_frequency_cpuid() -> Option<u64> {
    None
}
