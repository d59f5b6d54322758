//! Runtime Heap - Global Allocator over the board heap window
//!
//! The heap window sits between the loaded image and the stack reservation
//! (see [`crate::geometry`]). It is fixed at boot and never grows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    GlobalAlloc trait                     │
//! │                   (alloc/dealloc/etc)                    │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          HeapAllocator  ──►  RUNTIME_HEAP                │
//! │              (linked_list_allocator::Heap)               │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │      [ram_start + image_size, ram_end - stack_offset)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! // In the application crate:
//! #[global_allocator]
//! static ALLOCATOR: ironboard_bsp::heap::HeapAllocator =
//!     ironboard_bsp::heap::HeapAllocator::new();
//!
//! // bsp::init() sets up the window; after that alloc works
//! let v = alloc::vec![1, 2, 3];
//! ```

use core::alloc::{GlobalAlloc, Layout};
use core::fmt;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicBool, Ordering};

use ironboard_hwinit::hwlog;
use spin::Mutex;

/// Smallest window worth managing.
pub const MIN_HEAP_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    AlreadyInitialized,
    InvalidWindow,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::AlreadyInitialized => write!(f, "heap already initialized"),
            HeapError::InvalidWindow => write!(f, "invalid heap window"),
        }
    }
}

/// Snapshot of heap usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub base: usize,
    pub size: usize,
    pub used: usize,
    pub free: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// HEAP STATE
// ═══════════════════════════════════════════════════════════════════════════

struct HeapState {
    heap: linked_list_allocator::Heap,
    base: usize,
    size: usize,
}

/// A fixed-window heap.
///
/// Usable on its own (tests, secondary pools); the board heap is
/// [`RUNTIME_HEAP`].
pub struct RuntimeHeap {
    state: Mutex<Option<HeapState>>,
    /// Fast path check, avoids the lock before init.
    ready: AtomicBool,
}

impl RuntimeHeap {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    /// Hand `[base, base + size)` to the heap.
    ///
    /// # Safety
    /// The window must be unused RAM, owned by this heap from now on.
    pub unsafe fn init(&self, base: usize, size: usize) -> Result<(), HeapError> {
        if base == 0 || size < MIN_HEAP_SIZE || base.checked_add(size).is_none() {
            return Err(HeapError::InvalidWindow);
        }

        let mut guard = self.state.lock();
        if guard.is_some() {
            return Err(HeapError::AlreadyInitialized);
        }

        let mut heap = linked_list_allocator::Heap::empty();
        unsafe { heap.init(base as *mut u8, size) };
        *guard = Some(HeapState { heap, base, size });
        self.ready.store(true, Ordering::Release);

        hwlog!("HEAP", "initialized at {:#x}, size {:#x} bytes", base, size);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> Option<HeapStats> {
        let guard = self.state.lock();
        guard.as_ref().map(|s| HeapStats {
            base: s.base,
            size: s.size,
            used: s.heap.used(),
            free: s.heap.free(),
        })
    }
}

impl Default for RuntimeHeap {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for RuntimeHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !self.is_initialized() {
            return ptr::null_mut();
        }

        let mut guard = self.state.lock();
        match guard.as_mut() {
            Some(state) => state
                .heap
                .allocate_first_fit(layout)
                .map(|p| p.as_ptr())
                .unwrap_or(ptr::null_mut()),
            None => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if ptr.is_null() || !self.is_initialized() {
            return;
        }

        let mut guard = self.state.lock();
        if let (Some(state), Some(nn)) = (guard.as_mut(), NonNull::new(ptr)) {
            unsafe { state.heap.deallocate(nn, layout) };
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_layout = match Layout::from_size_align(new_size, layout.align()) {
            Ok(l) => l,
            Err(_) => return ptr::null_mut(),
        };

        let new_ptr = unsafe { self.alloc(new_layout) };
        if !new_ptr.is_null() && !ptr.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
                self.dealloc(ptr, layout);
            }
        }
        new_ptr
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BOARD HEAP
// ═══════════════════════════════════════════════════════════════════════════

/// The heap `bsp::init` sets up over the board's heap window.
pub static RUNTIME_HEAP: RuntimeHeap = RuntimeHeap::new();

/// Global heap allocator.
///
/// This is the type you use with `#[global_allocator]`; it forwards to
/// [`RUNTIME_HEAP`].
pub struct HeapAllocator;

impl HeapAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for HeapAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { RUNTIME_HEAP.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { RUNTIME_HEAP.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { RUNTIME_HEAP.realloc(ptr, layout, new_size) }
    }
}

/// Check if the board heap is initialized.
pub fn is_heap_initialized() -> bool {
    RUNTIME_HEAP.is_initialized()
}

/// Board heap statistics.
pub fn heap_stats() -> Option<HeapStats> {
    RUNTIME_HEAP.stats()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;
    use std::vec;

    fn window(size: usize) -> usize {
        Box::leak(vec![0u64; size / 8].into_boxed_slice()).as_mut_ptr() as usize
    }

    #[test]
    fn test_uninitialized_heap_returns_null() {
        let heap = RuntimeHeap::new();
        let p = unsafe { heap.alloc(Layout::from_size_align(16, 8).unwrap()) };
        assert!(p.is_null());
        assert!(heap.stats().is_none());
    }

    #[test]
    fn test_alloc_dealloc_stats() {
        let heap = RuntimeHeap::new();
        let base = window(0x4000);
        unsafe { heap.init(base, 0x4000) }.unwrap();

        let layout = Layout::from_size_align(256, 64).unwrap();
        let p = unsafe { heap.alloc(layout) };
        assert!(!p.is_null());
        assert_eq!(p as usize % 64, 0);
        assert!((base..base + 0x4000).contains(&(p as usize)));

        let stats = heap.stats().unwrap();
        assert_eq!(stats.base, base);
        assert_eq!(stats.size, 0x4000);
        assert!(stats.used >= 256);
        assert_eq!(stats.used + stats.free, 0x4000);

        unsafe { heap.dealloc(p, layout) };
        assert_eq!(heap.stats().unwrap().used, 0);
    }

    #[test]
    fn test_exhaustion_returns_null() {
        let heap = RuntimeHeap::new();
        unsafe { heap.init(window(0x1000), 0x1000) }.unwrap();
        let p = unsafe { heap.alloc(Layout::from_size_align(0x2000, 8).unwrap()) };
        assert!(p.is_null());
    }

    #[test]
    fn test_realloc_preserves_contents() {
        let heap = RuntimeHeap::new();
        unsafe { heap.init(window(0x4000), 0x4000) }.unwrap();

        let layout = Layout::from_size_align(16, 8).unwrap();
        unsafe {
            let p = heap.alloc(layout);
            ptr::write_bytes(p, 0xAB, 16);
            let q = heap.realloc(p, layout, 256);
            assert!(!q.is_null());
            assert_eq!(core::slice::from_raw_parts(q, 16), &[0xAB; 16]);
            heap.dealloc(q, Layout::from_size_align(256, 8).unwrap());
        }
    }

    #[test]
    fn test_init_rejections() {
        let heap = RuntimeHeap::new();
        assert_eq!(unsafe { heap.init(0, 0x4000) }, Err(HeapError::InvalidWindow));
        assert_eq!(unsafe { heap.init(0x1000, 16) }, Err(HeapError::InvalidWindow));

        let base = window(0x2000);
        unsafe { heap.init(base, 0x2000) }.unwrap();
        assert_eq!(
            unsafe { heap.init(base, 0x2000) },
            Err(HeapError::AlreadyInitialized)
        );
    }
}
