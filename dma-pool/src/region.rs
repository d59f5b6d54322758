//! DMA region.
//!
//! A first-fit allocator over one physically contiguous window. Buffers are
//! named by their bus address (what a device is programmed with); the CPU
//! reaches them through the copy calls or a scoped [`DmaView`].
//!
//! # Lifecycle
//!
//! ```text
//! Region::new()  ──init──►  ready  ──alloc/reserve──►  used block
//!      (uninitialized)        ▲                              │
//!                             └──────── free/release ────────┘
//! ```
//!
//! Every public call takes the region lock exactly once.

use core::fmt;
use core::ptr;

use ironboard_hwinit::{cache, hwlog};
use spin::Mutex;

use crate::block::{Block, FreeList, FREE_SLOTS};
use crate::error::{DmaError, Result};
use crate::registry::{Allocation, Kind, Registry};
use crate::view::DmaView;
use crate::MAX_ALLOCATIONS;

/// Usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
    pub size: usize,
    pub free_bytes: usize,
    pub used_bytes: usize,
    pub free_blocks: usize,
    pub allocations: usize,
    pub largest_free: usize,
}

/// Copy of the block layout at one instant.
#[derive(Clone)]
pub struct Snapshot {
    start: usize,
    size: usize,
    free: [Block; FREE_SLOTS],
    free_len: usize,
    used: [Block; MAX_ALLOCATIONS],
    used_len: usize,
}

impl Snapshot {
    /// Free blocks in address order.
    pub fn free_blocks(&self) -> &[Block] {
        &self.free[..self.free_len]
    }

    /// Used blocks in address order.
    pub fn used_blocks(&self) -> &[Block] {
        &self.used[..self.used_len]
    }

    /// Free and used blocks together cover `[start, start + size)` exactly,
    /// with no gap and no overlap.
    pub fn is_tiled(&self) -> bool {
        let (mut f, mut u) = (self.free_blocks().iter().peekable(), self.used_blocks().iter().peekable());
        let mut cursor = self.start;

        loop {
            let next = match (f.peek(), u.peek()) {
                (Some(a), Some(b)) if a.start <= b.start => f.next(),
                (Some(_), Some(_)) => u.next(),
                (Some(_), None) => f.next(),
                (None, Some(_)) => u.next(),
                (None, None) => break,
            };
            match next {
                Some(b) if b.start == cursor && b.size > 0 => cursor = b.end(),
                _ => return false,
            }
        }

        cursor == self.start + self.size
    }
}

struct RegionState {
    cpu_base: usize,
    bus_base: usize,
    size: usize,
    cached: bool,
    initialized: bool,
    /// Bumped on every `init` so views from before a reset are ignored.
    generation: u32,
    free: FreeList,
    used: Registry,
}

impl RegionState {
    const fn new() -> Self {
        Self {
            cpu_base: 0,
            bus_base: 0,
            size: 0,
            cached: false,
            initialized: false,
            generation: 0,
            free: FreeList::new(),
            used: Registry::new(),
        }
    }

    #[inline]
    fn ready(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(DmaError::NotInitialized)
        }
    }

    #[inline]
    fn cpu_addr(&self, bus: usize) -> usize {
        self.cpu_base + (bus - self.bus_base)
    }

    /// Bus address of `buf` if it lies entirely inside the window.
    fn bus_of(&self, buf: &[u8]) -> Option<usize> {
        if !self.initialized || buf.is_empty() {
            return None;
        }
        let p = buf.as_ptr() as usize;
        let off = p.checked_sub(self.cpu_base)?;
        if off.checked_add(buf.len())? <= self.size {
            Some(self.bus_base + off)
        } else {
            None
        }
    }

    fn take(&mut self, size: usize, align: usize, kind: Kind, borrowed: bool) -> Result<usize> {
        self.ready()?;

        if size == 0 {
            return Err(DmaError::ZeroSize);
        }
        if align != 0 && !align.is_power_of_two() {
            return Err(DmaError::InvalidAlignment);
        }
        if self.used.is_full() {
            return Err(DmaError::TooManyAllocations);
        }

        let addr = self.free.carve(size, align)?;
        self.used.insert(Allocation {
            block: Block::new(addr, size),
            kind,
            borrowed,
        })?;

        Ok(addr)
    }

    fn give_back(&mut self, addr: usize, kind: Kind) -> Result<()> {
        self.ready()?;

        let alloc = self.used.get(addr)?;
        if alloc.kind != kind {
            return Err(DmaError::KindMismatch);
        }
        if alloc.borrowed {
            return Err(DmaError::Busy);
        }

        let block = alloc.block;
        self.free.insert(block)?;
        self.used.remove(addr)?;
        Ok(())
    }

    /// CPU address of `[offset, offset + len)` inside the allocation at `addr`.
    fn span(&self, addr: usize, offset: usize, len: usize) -> Result<usize> {
        let alloc = self.used.get(addr)?;
        if alloc.borrowed {
            return Err(DmaError::Busy);
        }

        let end = offset.checked_add(len).ok_or(DmaError::SizeOverflow)?;
        if end > alloc.block.size {
            return Err(DmaError::OutOfBounds);
        }

        Ok(self.cpu_addr(addr) + offset)
    }
}

/// A DMA memory region.
pub struct Region {
    state: Mutex<RegionState>,
}

impl Region {
    /// An uninitialized region; every call fails with `NotInitialized`
    /// until [`Region::init`].
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RegionState::new()),
        }
    }

    /// Configure the window and reset all bookkeeping to one free block.
    ///
    /// `cpu_base` is where the CPU reaches the window, `bus_base` what devices
    /// see. On identity-mapped boards they are the same number.
    ///
    /// # Safety
    /// - `[cpu_base, cpu_base + size)` must be valid, writable memory owned
    ///   by this region for as long as it is used
    /// - no buffer or view from a previous `init` may still be in use
    pub unsafe fn init(&self, cpu_base: *mut u8, bus_base: usize, size: usize) -> Result<()> {
        let cpu = cpu_base as usize;

        if cpu == 0 || bus_base == 0 || size == 0 {
            return Err(DmaError::InvalidRegion);
        }
        if cpu.checked_add(size).is_none() || bus_base.checked_add(size).is_none() {
            return Err(DmaError::InvalidRegion);
        }

        let mut s = self.state.lock();
        s.cpu_base = cpu;
        s.bus_base = bus_base;
        s.size = size;
        s.initialized = true;
        s.generation = s.generation.wrapping_add(1);
        s.free.reset(Block::new(bus_base, size));
        s.used.clear();
        drop(s);

        hwlog!("DMA", "region {:#x}..{:#x} ({} KiB)", bus_base, bus_base + size, size / 1024);
        Ok(())
    }

    /// [`Region::init`] for an identity-mapped window.
    ///
    /// # Safety
    /// See [`Region::init`].
    pub unsafe fn init_identity(&self, start: usize, size: usize) -> Result<()> {
        unsafe { self.init(start as *mut u8, start, size) }
    }

    /// Perform cache maintenance on copies in and out of the region.
    ///
    /// Leave off when the window is mapped uncached or the bus is coherent.
    pub fn set_cached(&self, cached: bool) {
        self.state.lock().cached = cached;
    }

    pub fn is_cached(&self) -> bool {
        self.state.lock().cached
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// First bus address of the window.
    pub fn start(&self) -> usize {
        self.state.lock().bus_base
    }

    /// One past the last bus address of the window.
    pub fn end(&self) -> usize {
        let s = self.state.lock();
        s.bus_base + s.size
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    /// Bus address of `buf` if it lies inside this region.
    pub fn address_of(&self, buf: &[u8]) -> Option<usize> {
        self.state.lock().bus_of(buf)
    }

    /// Copy `data` into a new block aligned to `align` (`0` = no alignment)
    /// and return its bus address.
    ///
    /// A `data` slice that already lives inside the region (a reservation's
    /// view) and satisfies `align` is not copied; its own address is
    /// returned and it stays owned by the reservation. A misaligned one is
    /// copied into a fresh block like any other data.
    pub fn alloc(&self, data: &[u8], align: usize) -> Result<usize> {
        let mut s = self.state.lock();
        s.ready()?;

        if data.is_empty() {
            return Err(DmaError::ZeroSize);
        }
        if align != 0 && !align.is_power_of_two() {
            return Err(DmaError::InvalidAlignment);
        }
        if let Some(addr) = s.bus_of(data) {
            if align == 0 || addr % align == 0 {
                return Ok(addr);
            }
        }

        let addr = s.take(data.len(), align, Kind::Allocated, false)?;
        let cpu = s.cpu_addr(addr);

        // `data` may itself be region memory
        unsafe { ptr::copy(data.as_ptr(), cpu as *mut u8, data.len()) };
        if s.cached {
            cache::flush_range(cpu, data.len());
        }

        Ok(addr)
    }

    /// Reserve a zero-filled block for device-written data.
    ///
    /// Returns the bus address and a view over the block; release with
    /// [`Region::release`] once the view is dropped.
    pub fn reserve(&self, size: usize, align: usize) -> Result<(usize, DmaView<'_>)> {
        let mut s = self.state.lock();

        let addr = s.take(size, align, Kind::Reserved, true)?;
        let cpu = s.cpu_addr(addr);

        unsafe { ptr::write_bytes(cpu as *mut u8, 0, size) };
        if s.cached {
            cache::flush_range(cpu, size);
        }

        let generation = s.generation;
        drop(s);

        Ok((addr, unsafe { DmaView::new(self, addr, cpu as *mut u8, size, generation) }))
    }

    /// Copy `buf.len()` bytes at `offset` of the allocation at `addr` out.
    ///
    /// A `buf` inside the region is taken to already hold the data.
    pub fn read(&self, addr: usize, offset: usize, buf: &mut [u8]) -> Result<()> {
        let s = self.state.lock();
        s.ready()?;

        if buf.is_empty() || s.bus_of(buf).is_some() {
            return Ok(());
        }

        let cpu = s.span(addr, offset, buf.len())?;
        if s.cached {
            cache::invalidate_range(cpu, buf.len());
        }
        unsafe { ptr::copy_nonoverlapping(cpu as *const u8, buf.as_mut_ptr(), buf.len()) };

        Ok(())
    }

    /// Copy `data` to `offset` of the allocation at `addr`.
    pub fn write(&self, addr: usize, offset: usize, data: &[u8]) -> Result<()> {
        let s = self.state.lock();
        s.ready()?;

        if data.is_empty() {
            return Ok(());
        }

        let cpu = s.span(addr, offset, data.len())?;
        unsafe { ptr::copy(data.as_ptr(), cpu as *mut u8, data.len()) };
        if s.cached {
            cache::flush_range(cpu, data.len());
        }

        Ok(())
    }

    /// Exclusive view over the allocation at `addr`.
    pub fn view(&self, addr: usize) -> Result<DmaView<'_>> {
        let mut s = self.state.lock();
        s.ready()?;

        let alloc = s.used.get_mut(addr)?;
        if alloc.borrowed {
            return Err(DmaError::Busy);
        }
        alloc.borrowed = true;
        let len = alloc.block.size;

        let cpu = s.cpu_addr(addr);
        if s.cached {
            cache::invalidate_range(cpu, len);
        }

        let generation = s.generation;
        drop(s);

        Ok(unsafe { DmaView::new(self, addr, cpu as *mut u8, len, generation) })
    }

    /// Return a block obtained with [`Region::alloc`].
    pub fn free(&self, addr: usize) -> Result<()> {
        self.state.lock().give_back(addr, Kind::Allocated)
    }

    /// Return a block obtained with [`Region::reserve`].
    pub fn release(&self, addr: usize) -> Result<()> {
        self.state.lock().give_back(addr, Kind::Reserved)
    }

    pub fn stats(&self) -> RegionStats {
        let s = self.state.lock();
        RegionStats {
            size: s.size,
            free_bytes: s.free.total(),
            used_bytes: s.used.used_bytes(),
            free_blocks: s.free.as_slice().len(),
            allocations: s.used.count(),
            largest_free: s.free.largest(),
        }
    }

    /// Copy the current block layout.
    pub fn snapshot(&self) -> Snapshot {
        let s = self.state.lock();

        let mut snap = Snapshot {
            start: s.bus_base,
            size: s.size,
            free: [Block::EMPTY; FREE_SLOTS],
            free_len: 0,
            used: [Block::EMPTY; MAX_ALLOCATIONS],
            used_len: 0,
        };

        let free = s.free.as_slice();
        snap.free[..free.len()].copy_from_slice(free);
        snap.free_len = free.len();

        for (slot, alloc) in snap.used.iter_mut().zip(s.used.iter()) {
            *slot = alloc.block;
            snap.used_len += 1;
        }
        drop(s);

        snap.used[..snap.used_len].sort_unstable_by_key(|b| b.start);
        snap
    }

    /// Called by a dropping view.
    pub(crate) fn end_view(&self, addr: usize, cpu: usize, len: usize, generation: u32) {
        let mut s = self.state.lock();
        if s.generation != generation {
            return;
        }
        if let Ok(alloc) = s.used.get_mut(addr) {
            alloc.borrowed = false;
        }
        if s.cached {
            cache::flush_range(cpu, len);
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Region")
            .field("start", &format_args!("{:#x}", self.start()))
            .field("size", &format_args!("{:#x}", stats.size))
            .field("free", &stats.free_bytes)
            .field("allocations", &stats.allocations)
            .finish()
    }
}
