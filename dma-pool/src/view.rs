//! Scoped access to an allocation.

use core::fmt;
use core::ops::{Deref, DerefMut};
use core::slice;

use crate::region::Region;

/// Exclusive CPU view of one allocation.
///
/// While a view lives the allocation cannot be freed, released, read or
/// written through the region (those fail with `Busy`), and no second view
/// can be taken. Dropping the view ends the borrow and, on cached regions,
/// writes the contents back so a device sees them.
pub struct DmaView<'a> {
    region: &'a Region,
    addr: usize,
    ptr: *mut u8,
    len: usize,
    generation: u32,
}

// The pointer is into region memory the borrow flag grants exclusively.
unsafe impl Send for DmaView<'_> {}
unsafe impl Sync for DmaView<'_> {}

impl<'a> DmaView<'a> {
    /// # Safety
    /// `[ptr, ptr + len)` must be the CPU side of the allocation at `addr`,
    /// already marked borrowed in `region`.
    pub(crate) unsafe fn new(
        region: &'a Region,
        addr: usize,
        ptr: *mut u8,
        len: usize,
        generation: u32,
    ) -> Self {
        Self {
            region,
            addr,
            ptr,
            len,
            generation,
        }
    }

    /// Bus address of the first byte.
    #[inline]
    pub fn addr(&self) -> usize {
        self.addr
    }
}

impl Deref for DmaView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl DerefMut for DmaView<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for DmaView<'_> {
    fn drop(&mut self) {
        self.region
            .end_view(self.addr, self.ptr as usize, self.len, self.generation);
    }
}

impl fmt::Debug for DmaView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaView")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("len", &self.len)
            .finish()
    }
}
