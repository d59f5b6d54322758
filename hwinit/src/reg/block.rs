//! Register blocks.
//!
//! A driver validates its peripheral window once, at init, and afterwards
//! holds typed [`Register`] handles with fixed absolute addresses. Every
//! check here is a configuration check: the `new`/`reg` forms stop through
//! [`crate::fatal`], the `try_` forms hand back a [`RegisterError`].
//!
//! ```ignore
//! let uart = unsafe { RegisterBlock::new(0x0202_0000, 0x4000) };
//! let ucr1 = uart.reg::<u32>(0x80);
//! ucr1.set(0); // UARTEN
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::time::Duration;

use super::RegisterValue;
use crate::sync::Signal;

/// Invalid peripheral window or register offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// Base address is zero.
    NullBase,
    /// Window has no bytes.
    ZeroSize,
    /// `base + size` does not fit the address space.
    AddressOverflow,
    /// Register does not lie inside the window.
    OutOfBlock { offset: usize },
    /// Register address not aligned to its width.
    Misaligned { offset: usize },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::NullBase => write!(f, "null base address"),
            RegisterError::ZeroSize => write!(f, "zero-sized register window"),
            RegisterError::AddressOverflow => write!(f, "register window overflows address space"),
            RegisterError::OutOfBlock { offset } => {
                write!(f, "register offset {:#x} outside window", offset)
            }
            RegisterError::Misaligned { offset } => {
                write!(f, "register offset {:#x} misaligned", offset)
            }
        }
    }
}

/// A validated peripheral register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    base: usize,
    size: usize,
}

impl RegisterBlock {
    /// Validate a window; invalid windows are fatal.
    ///
    /// # Safety
    /// `[base, base + size)` must be the peripheral's MMIO window (or memory
    /// owned by the caller for as long as the block is used).
    pub unsafe fn new(base: usize, size: usize) -> Self {
        match unsafe { Self::try_new(base, size) } {
            Ok(block) => block,
            Err(e) => crate::fatal!("RegisterBlock::new", "{} (base {:#x} size {:#x})", e, base, size),
        }
    }

    /// Validate a window.
    ///
    /// # Safety
    /// Same as [`RegisterBlock::new`].
    pub unsafe fn try_new(base: usize, size: usize) -> Result<Self, RegisterError> {
        if base == 0 {
            return Err(RegisterError::NullBase);
        }
        if size == 0 {
            return Err(RegisterError::ZeroSize);
        }
        if base.checked_add(size).is_none() {
            return Err(RegisterError::AddressOverflow);
        }
        Ok(Self { base, size })
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Handle for the `T`-wide register at `offset`; fatal if invalid.
    pub fn reg<T: RegisterValue>(&self, offset: usize) -> Register<T> {
        match self.try_reg(offset) {
            Ok(reg) => reg,
            Err(e) => crate::fatal!("RegisterBlock::reg", "{} (block base {:#x} size {:#x})", e, self.base, self.size),
        }
    }

    pub fn try_reg<T: RegisterValue>(&self, offset: usize) -> Result<Register<T>, RegisterError> {
        let width = mem::size_of::<T>();

        match offset.checked_add(width) {
            Some(end) if end <= self.size => {}
            _ => return Err(RegisterError::OutOfBlock { offset }),
        }

        let addr = self.base + offset;
        if addr % width != 0 {
            return Err(RegisterError::Misaligned { offset });
        }

        Ok(Register {
            addr,
            _width: PhantomData,
        })
    }
}

/// A single register at a fixed address.
///
/// Obtained from [`RegisterBlock::reg`]; the block's validation is what makes
/// the methods safe.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Register<T: RegisterValue> {
    addr: usize,
    _width: PhantomData<T>,
}

impl<T: RegisterValue> fmt::Debug for Register<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register<u{}>({:#x})", T::BITS, self.addr)
    }
}

impl<T: RegisterValue> Register<T> {
    /// Handle for an arbitrary address.
    ///
    /// # Safety
    /// `addr` must be a valid, aligned register for `T` for the lifetime of
    /// the handle.
    pub const unsafe fn at(addr: usize) -> Self {
        Self {
            addr,
            _width: PhantomData,
        }
    }

    #[inline]
    pub fn addr(&self) -> usize {
        self.addr
    }

    #[inline]
    pub fn read(&self) -> T {
        unsafe { super::read(self.addr) }
    }

    #[inline]
    pub fn write(&self, val: T) {
        unsafe { super::write(self.addr, val) }
    }

    #[inline]
    pub fn get(&self, pos: u32, mask: T) -> T {
        unsafe { super::get(self.addr, pos, mask) }
    }

    #[inline]
    pub fn is_set(&self, pos: u32) -> bool {
        unsafe { super::is_set::<T>(self.addr, pos) }
    }

    pub fn set(&self, pos: u32) {
        unsafe { super::set::<T>(self.addr, pos) }
    }

    pub fn clear(&self, pos: u32) {
        unsafe { super::clear::<T>(self.addr, pos) }
    }

    pub fn set_to(&self, pos: u32, on: bool) {
        unsafe { super::set_to::<T>(self.addr, pos, on) }
    }

    pub fn set_n(&self, pos: u32, mask: T, val: T) {
        unsafe { super::set_n(self.addr, pos, mask, val) }
    }

    pub fn clear_n(&self, pos: u32, mask: T) {
        unsafe { super::clear_n(self.addr, pos, mask) }
    }

    pub fn or(&self, val: T) {
        unsafe { super::or(self.addr, val) }
    }

    pub fn write_back(&self) {
        unsafe { super::write_back::<T>(self.addr) }
    }

    pub fn wait(&self, pos: u32, mask: T, val: T) {
        unsafe { super::wait(self.addr, pos, mask, val) }
    }

    pub fn wait_for(&self, timeout: Duration, pos: u32, mask: T, val: T) -> bool {
        unsafe { super::wait_for(timeout, self.addr, pos, mask, val) }
    }

    pub fn wait_signal(&self, signal: &Signal, pos: u32, mask: T, val: T) -> bool {
        unsafe { super::wait_signal(signal, self.addr, pos, mask, val) }
    }
}
