//! Physical memory geometry.
//!
//! ```text
//!  ram_start                                              ram_end
//!  │ image │ heap ......................................│ stack │
//!          ▲                                            ▲
//!   ram_start + image_size              ram_end - ram_stack_offset
//!
//!  dma_start            dma_end
//!  │ DMA window ........│      (anywhere outside [ram_start, ram_end))
//! ```
//!
//! The stack grows down from `ram_end`; `ram_stack_offset` bytes below the
//! top of RAM are kept for it. A board without dedicated DMA memory carves
//! its window off the end of DRAM and leaves it out of `ram_size`.

use core::fmt;

use crate::heap::MIN_HEAP_SIZE;

/// Board memory layout. All values are physical addresses / byte counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryGeometry {
    pub ram_start: usize,
    pub ram_size: usize,
    /// Bytes reserved for the stack at the top of RAM.
    pub ram_stack_offset: usize,
    /// Bytes at the bottom of RAM taken by the loaded image.
    pub image_size: usize,
    pub dma_start: usize,
    pub dma_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    EmptyRam,
    RamOverflow,
    /// Image and stack leave nothing in between.
    NoHeap,
    /// Heap window smaller than `MIN_HEAP_SIZE`.
    HeapTooSmall,
    EmptyDma,
    DmaOverflow,
    /// The DMA window shares bytes with the image, heap or stack.
    DmaOverlapsRam,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRam => write!(f, "ram window is empty"),
            Self::RamOverflow => write!(f, "ram window wraps the address space"),
            Self::NoHeap => write!(f, "image and stack leave no heap"),
            Self::HeapTooSmall => write!(f, "heap window below {:#x} bytes", MIN_HEAP_SIZE),
            Self::EmptyDma => write!(f, "dma window is empty"),
            Self::DmaOverflow => write!(f, "dma window wraps the address space"),
            Self::DmaOverlapsRam => write!(f, "dma window overlaps ram"),
        }
    }
}

/// A `[start, start + size)` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub size: usize,
}

impl Window {
    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    #[inline]
    pub const fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end()
    }
}

impl MemoryGeometry {
    fn ram_end(&self) -> Result<usize, GeometryError> {
        if self.ram_size == 0 {
            return Err(GeometryError::EmptyRam);
        }
        self.ram_start
            .checked_add(self.ram_size)
            .ok_or(GeometryError::RamOverflow)
    }

    /// Top of the stack (initial stack pointer).
    pub fn stack_top(&self) -> Result<usize, GeometryError> {
        self.ram_end()
    }

    /// The window the runtime heap may use.
    pub fn heap(&self) -> Result<Window, GeometryError> {
        let end = self.ram_end()?;
        let start = self
            .ram_start
            .checked_add(self.image_size)
            .ok_or(GeometryError::NoHeap)?;
        let limit = end
            .checked_sub(self.ram_stack_offset)
            .ok_or(GeometryError::NoHeap)?;

        if start == 0 || limit <= start {
            return Err(GeometryError::NoHeap);
        }
        if limit - start < MIN_HEAP_SIZE {
            return Err(GeometryError::HeapTooSmall);
        }
        Ok(Window {
            start,
            size: limit - start,
        })
    }

    /// The DMA window.
    pub fn dma(&self) -> Result<Window, GeometryError> {
        if self.dma_start == 0 || self.dma_size == 0 {
            return Err(GeometryError::EmptyDma);
        }
        if self.dma_start.checked_add(self.dma_size).is_none() {
            return Err(GeometryError::DmaOverflow);
        }
        Ok(Window {
            start: self.dma_start,
            size: self.dma_size,
        })
    }

    /// Check the layout is usable as a whole.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.heap()?;
        let dma = self.dma()?;

        let ram = Window {
            start: self.ram_start,
            size: self.ram_size,
        };
        if dma.overlaps(&ram) {
            return Err(GeometryError::DmaOverlapsRam);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: MemoryGeometry = MemoryGeometry {
        ram_start: 0x8000_0000,
        ram_size: 0x2000_0000,
        ram_stack_offset: 0x100,
        image_size: 0x10_0000,
        dma_start: 0x0090_0000,
        dma_size: 0x2_0000,
    };

    #[test]
    fn test_heap_window_between_image_and_stack() {
        let heap = GOOD.heap().unwrap();
        assert_eq!(heap.start, 0x8010_0000);
        assert_eq!(heap.end(), 0xA000_0000 - 0x100);
        assert_eq!(GOOD.stack_top(), Ok(0xA000_0000));
        assert_eq!(GOOD.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_empty_windows() {
        let g = MemoryGeometry { ram_size: 0, ..GOOD };
        assert_eq!(g.validate(), Err(GeometryError::EmptyRam));

        let g = MemoryGeometry { dma_size: 0, ..GOOD };
        assert_eq!(g.validate(), Err(GeometryError::EmptyDma));
    }

    #[test]
    fn test_rejects_stack_offset_eating_heap() {
        let g = MemoryGeometry {
            ram_stack_offset: GOOD.ram_size - GOOD.image_size,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::NoHeap));

        let g = MemoryGeometry {
            ram_stack_offset: GOOD.ram_size + 1,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::NoHeap));
    }

    #[test]
    fn test_rejects_wrapping_windows() {
        let g = MemoryGeometry {
            ram_start: usize::MAX - 0xFF,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::RamOverflow));

        let g = MemoryGeometry {
            dma_start: usize::MAX - 0xFF,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::DmaOverflow));
    }

    #[test]
    fn test_rejects_dma_inside_heap() {
        let g = MemoryGeometry {
            dma_start: 0x9000_0000,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::DmaOverlapsRam));
    }

    #[test]
    fn test_rejects_dma_over_image_or_stack() {
        let over_image = MemoryGeometry {
            dma_start: GOOD.ram_start,
            dma_size: 0x1000,
            ..GOOD
        };
        assert_eq!(over_image.validate(), Err(GeometryError::DmaOverlapsRam));

        let over_stack = MemoryGeometry {
            dma_start: 0xA000_0000 - 0x100,
            dma_size: 0x100,
            ..GOOD
        };
        assert_eq!(over_stack.validate(), Err(GeometryError::DmaOverlapsRam));
    }

    #[test]
    fn test_dma_carved_past_ram_end() {
        let g = MemoryGeometry {
            ram_size: 0x1F00_0000,
            dma_start: 0x9F00_0000,
            dma_size: 0x100_0000,
            ..GOOD
        };
        assert_eq!(g.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_heap_below_minimum() {
        let g = MemoryGeometry {
            ram_size: GOOD.image_size + GOOD.ram_stack_offset + 0x800,
            ..GOOD
        };
        assert_eq!(g.heap(), Err(GeometryError::HeapTooSmall));
        assert_eq!(g.validate(), Err(GeometryError::HeapTooSmall));

        let g = MemoryGeometry {
            ram_size: GOOD.image_size + GOOD.ram_stack_offset + MIN_HEAP_SIZE,
            ..GOOD
        };
        assert_eq!(g.heap().map(|w| w.size), Ok(MIN_HEAP_SIZE));
    }

    #[test]
    fn test_rejects_heap_at_address_zero() {
        let g = MemoryGeometry {
            ram_start: 0,
            image_size: 0,
            ..GOOD
        };
        assert_eq!(g.validate(), Err(GeometryError::NoHeap));
    }
}
