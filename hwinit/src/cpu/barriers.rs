//! Memory barriers.
//!
//! `mb` orders all memory accesses, `rmb` loads, `wmb` stores. On the targets
//! we care about these are also compiler barriers (no `nomem` on the asm).
//!
//! ARM (32-bit) uses the ARMv7 `dsb`; ARMv6 parts need the CP15 form and are
//! not supported here.

/// Full barrier.
#[inline]
pub fn mb() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("mfence", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!("dsb", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("fence iorw, iorw", options(nostack));
    }

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "arm",
        target_arch = "riscv64"
    )))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Load barrier.
#[inline]
pub fn rmb() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("lfence", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("dsb ld", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("fence ir, ir", options(nostack));
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64")))]
    mb();
}

/// Store barrier.
#[inline]
pub fn wmb() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("sfence", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("dsb st", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("fence ow, ow", options(nostack));
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64")))]
    mb();
}

/// Instruction synchronization (after system register writes).
#[inline]
pub fn isb() {
    #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
    unsafe {
        core::arch::asm!("isb", options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
