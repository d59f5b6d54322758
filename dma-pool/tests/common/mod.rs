//! Common test utilities: host-backed regions and a deterministic RNG

use dma_pool::Region;
use std::ops::Deref;

/// A region whose window is a heap buffer, seen by "devices" at `bus`.
pub struct HostedRegion {
    region: Region,
    _mem: Vec<u8>,
}

impl HostedRegion {
    pub fn new(bus: usize, size: usize) -> Self {
        let mut mem = vec![0u8; size];
        let region = Region::new();
        unsafe { region.init(mem.as_mut_ptr(), bus, size) }.expect("Should init hosted region");
        Self { region, _mem: mem }
    }
}

impl Deref for HostedRegion {
    type Target = Region;

    fn deref(&self) -> &Region {
        &self.region
    }
}

/// xorshift64*, good enough to shuffle allocation sequences reproducibly.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `[lo, hi)`.
    pub fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next() % (hi - lo) as u64) as usize
    }
}
