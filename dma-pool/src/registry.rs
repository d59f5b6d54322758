//! Allocation registry.
//!
//! Fixed table of live allocations keyed by start address. Lookups are
//! linear; the table is small and lifecycle calls are rare next to register
//! polling.

use crate::block::Block;
use crate::error::{DmaError, Result};
use crate::MAX_ALLOCATIONS;

/// How a block was obtained, and therefore how it must be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `alloc` / `free`
    Allocated,
    /// `reserve` / `release`
    Reserved,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Allocation {
    pub block: Block,
    pub kind: Kind,
    /// A `DmaView` is live.
    pub borrowed: bool,
}

pub(crate) struct Registry {
    slots: [Option<Allocation>; MAX_ALLOCATIONS],
    count: usize,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_ALLOCATIONS],
            count: 0,
        }
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_ALLOCATIONS];
        self.count = 0;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == MAX_ALLOCATIONS
    }

    pub fn used_bytes(&self) -> usize {
        self.iter().map(|a| a.block.size).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.slots.iter().flatten()
    }

    pub fn insert(&mut self, alloc: Allocation) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(DmaError::TooManyAllocations)?;
        *slot = Some(alloc);
        self.count += 1;
        Ok(())
    }

    fn position(&self, addr: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(a) if a.block.start == addr))
    }

    pub fn get(&self, addr: usize) -> Result<&Allocation> {
        self.slots
            .iter()
            .flatten()
            .find(|a| a.block.start == addr)
            .ok_or(DmaError::NotAllocated)
    }

    pub fn get_mut(&mut self, addr: usize) -> Result<&mut Allocation> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|a| a.block.start == addr)
            .ok_or(DmaError::NotAllocated)
    }

    pub fn remove(&mut self, addr: usize) -> Result<Allocation> {
        let idx = self.position(addr).ok_or(DmaError::NotAllocated)?;
        let alloc = self.slots[idx].take().ok_or(DmaError::NotAllocated)?;
        self.count -= 1;
        Ok(alloc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: usize, size: usize) -> Allocation {
        Allocation {
            block: Block::new(start, size),
            kind: Kind::Allocated,
            borrowed: false,
        }
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut r = Registry::new();
        r.insert(entry(0x1000, 16)).unwrap();
        r.insert(entry(0x2000, 32)).unwrap();

        assert_eq!(r.count(), 2);
        assert_eq!(r.used_bytes(), 48);
        assert_eq!(r.get(0x2000).unwrap().block.size, 32);
        assert_eq!(r.get(0x2004).unwrap_err(), DmaError::NotAllocated);

        r.get_mut(0x1000).unwrap().borrowed = true;
        assert!(r.get(0x1000).unwrap().borrowed);

        assert_eq!(r.remove(0x1000).unwrap().block.start, 0x1000);
        assert_eq!(r.remove(0x1000).unwrap_err(), DmaError::NotAllocated);
        assert_eq!(r.count(), 1);
    }

    #[test]
    fn test_full_table_rejects_insert() {
        let mut r = Registry::new();
        for i in 0..MAX_ALLOCATIONS {
            r.insert(entry(0x1000 + i * 16, 16)).unwrap();
        }
        assert!(r.is_full());
        assert_eq!(
            r.insert(entry(0x10_0000, 16)).unwrap_err(),
            DmaError::TooManyAllocations
        );

        r.remove(0x1000).unwrap();
        r.insert(entry(0x10_0000, 16)).unwrap();
    }
}
