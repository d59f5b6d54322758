//! CPU Management
//!
//! The architecture-specific corner of the crate. Everything above this
//! module is portable.
//!
//! # Modules
//!
//! - `barriers` - Memory barriers
//! - `cache` - Data cache maintenance
//! - `tsc` - Time Stamp Counter (x86_64)

pub mod barriers;
pub mod cache;
pub mod tsc;

/// Idle the CPU until the next interrupt (or just spin on hosted targets).
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(all(bare_metal, target_arch = "x86_64"))]
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }

    #[cfg(all(bare_metal, any(target_arch = "aarch64", target_arch = "arm")))]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
    }

    #[cfg(all(bare_metal, target_arch = "riscv64"))]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }

    #[cfg(not(bare_metal))]
    core::hint::spin_loop();
}

/// Park this CPU forever.
pub fn halt() -> ! {
    loop {
        wait_for_interrupt();
    }
}
