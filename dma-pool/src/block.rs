//! Free list.
//!
//! Address-ordered array of free blocks. Two invariants keep it bounded:
//!
//! - no two free blocks are adjacent (`free` coalesces on both sides)
//! - every gap between free blocks holds at least one used block
//!
//! so `free blocks <= used blocks + 1`, and `MAX_ALLOCATIONS + 1` slots are
//! always enough.

use crate::error::{DmaError, Result};
use crate::{align_up, MAX_ALLOCATIONS};

/// Free list capacity.
pub const FREE_SLOTS: usize = MAX_ALLOCATIONS + 1;

/// A span of bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub size: usize,
}

impl Block {
    pub const EMPTY: Block = Block { start: 0, size: 0 };

    #[inline]
    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }
}

pub(crate) struct FreeList {
    blocks: [Block; FREE_SLOTS],
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        Self {
            blocks: [Block::EMPTY; FREE_SLOTS],
            len: 0,
        }
    }

    /// Forget everything and start over with one block spanning `whole`.
    pub fn reset(&mut self, whole: Block) {
        self.blocks[0] = whole;
        self.len = 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[Block] {
        &self.blocks[..self.len]
    }

    pub fn total(&self) -> usize {
        self.as_slice().iter().map(|b| b.size).sum()
    }

    pub fn largest(&self) -> usize {
        self.as_slice().iter().map(|b| b.size).max().unwrap_or(0)
    }

    fn insert_at(&mut self, idx: usize, block: Block) {
        self.blocks.copy_within(idx..self.len, idx + 1);
        self.blocks[idx] = block;
        self.len += 1;
    }

    fn remove_at(&mut self, idx: usize) {
        self.blocks.copy_within(idx + 1..self.len, idx);
        self.len -= 1;
    }

    /// First-fit: take `size` bytes starting on an `align` boundary
    /// (`0` = unaligned) out of the first block holding `size + align`.
    ///
    /// Leading padding and trailing slack stay on the free list. Returns the
    /// start of the carved span.
    pub fn carve(&mut self, size: usize, align: usize) -> Result<usize> {
        let needed = if align > 0 {
            size.checked_add(align).ok_or(DmaError::SizeOverflow)?
        } else {
            size
        };

        let idx = self
            .as_slice()
            .iter()
            .position(|b| b.size >= needed)
            .ok_or(DmaError::OutOfMemory)?;

        let block = self.blocks[idx];
        // cannot overflow: start + align - 1 < block.end()
        let start = if align > 0 { align_up(block.start, align) } else { block.start };

        let lead = Block::new(block.start, start - block.start);
        let trail = Block::new(start + size, block.end() - (start + size));

        match (lead.size > 0, trail.size > 0) {
            (false, false) => self.remove_at(idx),
            (true, false) => self.blocks[idx] = lead,
            (false, true) => self.blocks[idx] = trail,
            (true, true) => {
                if self.len == FREE_SLOTS {
                    return Err(DmaError::TooManyAllocations);
                }
                self.blocks[idx] = lead;
                self.insert_at(idx + 1, trail);
            }
        }

        Ok(start)
    }

    /// Return a span, merging it with an exactly adjacent free block on
    /// either side.
    pub fn insert(&mut self, freed: Block) -> Result<()> {
        let idx = self.as_slice().partition_point(|b| b.start < freed.start);

        let merge_prev = idx > 0 && self.blocks[idx - 1].end() == freed.start;
        let merge_next = idx < self.len && freed.end() == self.blocks[idx].start;

        debug_assert!(idx == 0 || self.blocks[idx - 1].end() <= freed.start);
        debug_assert!(idx == self.len || freed.end() <= self.blocks[idx].start);

        match (merge_prev, merge_next) {
            (true, true) => {
                self.blocks[idx - 1].size += freed.size + self.blocks[idx].size;
                self.remove_at(idx);
            }
            (true, false) => self.blocks[idx - 1].size += freed.size,
            (false, true) => {
                self.blocks[idx].start = freed.start;
                self.blocks[idx].size += freed.size;
            }
            (false, false) => {
                if self.len == FREE_SLOTS {
                    return Err(DmaError::TooManyAllocations);
                }
                self.insert_at(idx, freed);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(start: usize, size: usize) -> FreeList {
        let mut l = FreeList::new();
        l.reset(Block::new(start, size));
        l
    }

    #[test]
    fn test_unaligned_carve_takes_from_front() {
        let mut l = list(0x1000, 0x100);
        assert_eq!(l.carve(0x10, 0), Ok(0x1000));
        assert_eq!(l.as_slice(), &[Block::new(0x1010, 0xF0)]);
    }

    #[test]
    fn test_aligned_carve_leaves_pad_and_slack() {
        let mut l = list(0x1004, 0x1000);
        let addr = l.carve(0x20, 0x100).unwrap();

        assert_eq!(addr, 0x1100);
        assert_eq!(
            l.as_slice(),
            &[Block::new(0x1004, 0xFC), Block::new(0x1120, 0x1004 + 0x1000 - 0x1120)]
        );
    }

    #[test]
    fn test_first_fit_needs_size_plus_align() {
        // 0x30 bytes are free and already aligned, but first-fit demands 0x20 + 0x20
        let mut l = list(0x2000, 0x30);
        assert_eq!(l.carve(0x20, 0x20), Err(DmaError::OutOfMemory));
        assert_eq!(l.carve(0x10, 0x20), Ok(0x2000));
    }

    #[test]
    fn test_exact_fit_removes_block() {
        let mut l = list(0x1000, 0x40);
        assert_eq!(l.carve(0x40, 0), Ok(0x1000));
        assert!(l.as_slice().is_empty());
        assert_eq!(l.carve(1, 0), Err(DmaError::OutOfMemory));
    }

    #[test]
    fn test_insert_coalesces_both_sides() {
        let mut l = list(0x1000, 0x30);
        let a = l.carve(0x10, 0).unwrap();
        let b = l.carve(0x10, 0).unwrap();
        let c = l.carve(0x10, 0).unwrap();
        assert!(l.as_slice().is_empty());

        l.insert(Block::new(a, 0x10)).unwrap();
        l.insert(Block::new(c, 0x10)).unwrap();
        assert_eq!(l.as_slice().len(), 2);

        l.insert(Block::new(b, 0x10)).unwrap();
        assert_eq!(l.as_slice(), &[Block::new(0x1000, 0x30)]);
    }

    #[test]
    fn test_insert_keeps_address_order() {
        let mut l = list(0x1000, 0x100);
        let blocks: [usize; 5] = core::array::from_fn(|_| l.carve(0x10, 0).unwrap());

        l.insert(Block::new(blocks[3], 0x10)).unwrap();
        l.insert(Block::new(blocks[1], 0x10)).unwrap();

        let starts: [usize; 3] = core::array::from_fn(|i| l.as_slice()[i].start);
        assert_eq!(starts, [blocks[1], blocks[3], 0x1050]);
        assert_eq!(l.total(), 0x100 - 0x30);
        assert_eq!(l.largest(), 0xB0);
    }
}
