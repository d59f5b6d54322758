//! x86 port I/O.
//!
//! Legacy devices (COM UARTs, PIT, PCI config mechanism #1) sit in the
//! 64 KiB I/O space instead of memory. `in`/`out` are serialising on their
//! own, so no barriers are added. All of these need I/O privilege: ring 0 on
//! bare metal, `iopl` on a hosted kernel.

use core::arch::asm;

use super::RegisterError;

/// # Safety
/// `port` must belong to a device the caller drives.
#[inline]
pub unsafe fn in8(port: u16) -> u8 {
    let val: u8;
    unsafe { asm!("in al, dx", in("dx") port, out("al") val, options(nomem, nostack, preserves_flags)) };
    val
}

/// # Safety
/// See [`in8`].
#[inline]
pub unsafe fn in16(port: u16) -> u16 {
    let val: u16;
    unsafe { asm!("in ax, dx", in("dx") port, out("ax") val, options(nomem, nostack, preserves_flags)) };
    val
}

/// # Safety
/// See [`in8`].
#[inline]
pub unsafe fn in32(port: u16) -> u32 {
    let val: u32;
    unsafe { asm!("in eax, dx", in("dx") port, out("eax") val, options(nomem, nostack, preserves_flags)) };
    val
}

/// # Safety
/// See [`in8`].
#[inline]
pub unsafe fn out8(port: u16, val: u8) {
    unsafe { asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags)) };
}

/// # Safety
/// See [`in8`].
#[inline]
pub unsafe fn out16(port: u16, val: u16) {
    unsafe { asm!("out dx, ax", in("dx") port, in("ax") val, options(nomem, nostack, preserves_flags)) };
}

/// # Safety
/// See [`in8`].
#[inline]
pub unsafe fn out32(port: u16, val: u32) {
    unsafe { asm!("out dx, eax", in("dx") port, in("eax") val, options(nomem, nostack, preserves_flags)) };
}

/// A device's range of I/O ports, e.g. the eight registers of a 16550.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBlock {
    base: u16,
    len: u16,
}

impl PortBlock {
    pub const fn new(base: u16, len: u16) -> Self {
        Self { base, len }
    }

    #[inline]
    pub const fn base(&self) -> u16 {
        self.base
    }

    /// Port number of register `offset`.
    pub const fn port(&self, offset: u16) -> Result<u16, RegisterError> {
        if offset >= self.len {
            return Err(RegisterError::OutOfBlock {
                offset: offset as usize,
            });
        }
        match self.base.checked_add(offset) {
            Some(port) => Ok(port),
            None => Err(RegisterError::AddressOverflow),
        }
    }

    /// # Safety
    /// The block must be the caller's device.
    pub unsafe fn read8(&self, offset: u16) -> Result<u8, RegisterError> {
        let port = self.port(offset)?;
        Ok(unsafe { in8(port) })
    }

    /// # Safety
    /// The block must be the caller's device.
    pub unsafe fn write8(&self, offset: u16, val: u8) -> Result<(), RegisterError> {
        let port = self.port(offset)?;
        unsafe { out8(port, val) };
        Ok(())
    }
}
