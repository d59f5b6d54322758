//! DMA region allocator.
//!
//! First-fit free-list allocator over a physically contiguous memory window,
//! handing out buffers with a stable device-visible (bus) address. Used by
//! every peripheral driver that needs descriptors or data buffers a device
//! can master.
//!
//! # Design Philosophy
//!
//! - **No heap**: bookkeeping lives in fixed arrays inside the region, so the
//!   allocator works from the boot entry point before any heap exists
//! - **Addresses, not pointers**: callers hold bus addresses; the CPU side is
//!   reached through copies or a scoped [`DmaView`]
//! - **Explicit regions**: any number of [`Region`]s can coexist with the
//!   process-wide default one
//! - **Thread-safe**: one spin lock per region, one critical section per call
//!
//! # Usage
//!
//! ```ignore
//! // Board init
//! unsafe { dma_pool::init(0x0090_0000, 0x2_0000) };
//!
//! // Driver: descriptor ring the device writes into
//! let (ring, mut view) = dma_pool::reserve(16 * 64, 64);
//! view.fill(0);
//! drop(view);
//! write_reg(RDBAL, ring as u32);
//!
//! // Driver: transmit buffer
//! let addr = dma_pool::alloc(&frame, 0);
//! // ... device sends ...
//! dma_pool::free(addr);
//! ```
//!
//! The free functions operate on the default region and stop through the
//! fatal handler on any error. [`Region`] methods return [`Result`].

#![no_std]

pub mod block;
pub mod error;
pub mod region;
pub mod registry;
pub mod view;

pub use block::Block;
pub use error::{DmaError, ErrorClass, Result};
pub use region::{Region, RegionStats, Snapshot};
pub use registry::Kind;
pub use view::DmaView;

use ironboard_hwinit::fatal;
use spin::Mutex;

/// Maximum live allocations per region.
pub const MAX_ALLOCATIONS: usize = 256;

// ============================================================================
// Alignment
// ============================================================================

/// Align a value up to the given power-of-two alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

// ============================================================================
// Default region
// ============================================================================

static DEFAULT: Region = Region::new();

/// Window to apply on first use of the default region.
static PENDING: Mutex<Option<(usize, usize)>> = Mutex::new(None);

/// Initialize the default region over an identity-mapped window.
///
/// # Safety
/// See [`Region::init`].
pub unsafe fn init(start: usize, size: usize) {
    if let Err(e) = unsafe { DEFAULT.init_identity(start, size) } {
        fatal!("dma::init", "{} (start {:#x} size {:#x})", e, start, size);
    }
}

/// Record the default window without touching it yet; the region is
/// initialized on first use.
///
/// # Safety
/// See [`Region::init`].
pub unsafe fn configure_default(start: usize, size: usize) {
    *PENDING.lock() = Some((start, size));
}

/// The process-wide default region.
pub fn default() -> &'static Region {
    if !DEFAULT.is_initialized() {
        let mut pending = PENDING.lock();
        if let Some((start, size)) = pending.take() {
            // SAFETY: the window was vouched for by `configure_default`
            if let Err(e) = unsafe { DEFAULT.init_identity(start, size) } {
                fatal!("dma::default", "{} (start {:#x} size {:#x})", e, start, size);
            }
        }
    }
    &DEFAULT
}

/// Copy `data` into the default region. See [`Region::alloc`].
pub fn alloc(data: &[u8], align: usize) -> usize {
    match default().alloc(data, align) {
        Ok(addr) => addr,
        Err(e) => fatal!("dma::alloc", "{} (size {:#x} align {:#x})", e, data.len(), align),
    }
}

/// Reserve a zero-filled block in the default region. See [`Region::reserve`].
pub fn reserve(size: usize, align: usize) -> (usize, DmaView<'static>) {
    match default().reserve(size, align) {
        Ok(r) => r,
        Err(e) => fatal!("dma::reserve", "{} (size {:#x} align {:#x})", e, size, align),
    }
}

/// Bus address of `buf` if it lies inside the default region.
pub fn address_of(buf: &[u8]) -> Option<usize> {
    default().address_of(buf)
}

pub fn read(addr: usize, offset: usize, buf: &mut [u8]) {
    if let Err(e) = default().read(addr, offset, buf) {
        fatal!("dma::read", "{} (addr {:#x} offset {:#x} len {:#x})", e, addr, offset, buf.len());
    }
}

pub fn write(addr: usize, offset: usize, data: &[u8]) {
    if let Err(e) = default().write(addr, offset, data) {
        fatal!("dma::write", "{} (addr {:#x} offset {:#x} len {:#x})", e, addr, offset, data.len());
    }
}

pub fn free(addr: usize) {
    if let Err(e) = default().free(addr) {
        fatal!("dma::free", "{} (addr {:#x})", e, addr);
    }
}

pub fn release(addr: usize) {
    if let Err(e) = default().release(addr) {
        fatal!("dma::release", "{} (addr {:#x})", e, addr);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_functions() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(0x1004, 0x100), 0x1100);
    }
}
