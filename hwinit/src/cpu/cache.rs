//! Data cache maintenance.
//!
//! Explicit flush (clean) and invalidate operations around DMA transfers and
//! cached MMIO windows. All operations are synchronous: they return after the
//! completing barrier.
//!
//! | arch             | by range                    | whole cache           |
//! |------------------|-----------------------------|-----------------------|
//! | aarch64          | `dc cvac` / `dc civac`      | set/way (bare metal)  |
//! | arm (v7-A)       | `DCCMVAC` / `DCCIMVAC`      | set/way (bare metal)  |
//! | x86_64           | `clflush`                   | `wbinvd` (bare metal) |
//! | others           | barrier only                | barrier only          |
//!
//! Invalidation always cleans too. A DMA buffer rarely starts and ends on a
//! line boundary, and a pure invalidate would throw away dirty neighbours
//! sharing the edge lines. x86_64 is DMA-coherent, so there "invalidate" is
//! a flush plus fence.
//!
//! # Usage
//!
//! ```ignore
//! cache::flush_range(buf_addr, len);      // before the device reads
//! ring_doorbell();
//! wait_for_completion();
//! cache::invalidate_range(buf_addr, len); // before the CPU reads
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

use super::barriers;

/// Fallback line size when the CPU does not tell us.
pub const DEFAULT_LINE_SIZE: usize = 64;

static LINE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Smallest data cache line size in bytes.
pub fn line_size() -> usize {
    let cached = LINE_SIZE.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }

    let size = arch::probe_line_size().unwrap_or(DEFAULT_LINE_SIZE);
    LINE_SIZE.store(size, Ordering::Relaxed);
    size
}

/// Visit the start address of every line overlapping `[addr, addr + len)`.
fn for_each_line(addr: usize, len: usize, mut op: impl FnMut(usize)) {
    if len == 0 {
        return;
    }

    let line = line_size();
    let end = addr.saturating_add(len);
    let mut p = addr & !(line - 1);

    while p < end {
        op(p);
        p = match p.checked_add(line) {
            Some(next) => next,
            None => break,
        };
    }
}

/// Write back dirty lines covering the range so a device sees current data.
pub fn flush_range(addr: usize, len: usize) {
    for_each_line(addr, len, arch::clean_line);
    barriers::mb();
}

/// Clean and invalidate lines covering the range so the CPU re-reads memory.
pub fn invalidate_range(addr: usize, len: usize) {
    for_each_line(addr, len, arch::clean_invalidate_line);
    barriers::mb();
}

/// Write back the whole data cache.
pub fn flush_all() {
    arch::clean_all();
    barriers::mb();
}

/// Clean and invalidate the whole data cache.
pub fn invalidate_all() {
    arch::clean_invalidate_all();
    barriers::mb();
}

// ═══════════════════════════════════════════════════════════════════════════
// SET/WAY WALK (ARMv7-A / ARMv8-A, bare metal)
// ═══════════════════════════════════════════════════════════════════════════

/// Operations the set/way walker needs from the architecture.
#[cfg(all(bare_metal, any(target_arch = "aarch64", target_arch = "arm")))]
trait SetWay {
    fn read_clidr() -> u32;
    fn select_level(level: u32);
    fn read_ccsidr() -> u32;
    fn by_set_way(value: u32, invalidate: bool);
}

/// Walk every data/unified cache level up to the Level of Coherency.
#[cfg(all(bare_metal, any(target_arch = "aarch64", target_arch = "arm")))]
fn walk_set_way<A: SetWay>(invalidate: bool) {
    let clidr = A::read_clidr();
    let loc = (clidr >> 24) & 0x7;

    for level in 0..loc {
        // Ctype: 0 none, 1 icache only, 2+ has a data cache
        let ctype = (clidr >> (level * 3)) & 0x7;
        if ctype < 2 {
            continue;
        }

        A::select_level(level << 1);
        barriers::isb();

        let ccsidr = A::read_ccsidr();
        let line_shift = (ccsidr & 0x7) + 4;
        let ways = ((ccsidr >> 3) & 0x3FF) + 1;
        let sets = ((ccsidr >> 13) & 0x7FFF) + 1;
        let way_shift = (ways - 1).leading_zeros();

        for way in 0..ways {
            let way_bits = way.checked_shl(way_shift).unwrap_or(0);
            for set in 0..sets {
                A::by_set_way(way_bits | (set << line_shift) | (level << 1), invalidate);
            }
        }
    }

    barriers::mb();
    barriers::isb();
}

// ═══════════════════════════════════════════════════════════════════════════
// ARCH BACKENDS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_arch = "aarch64")]
mod arch {
    pub fn probe_line_size() -> Option<usize> {
        let ctr: u64;
        unsafe {
            core::arch::asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack, preserves_flags));
        }
        // DminLine: log2 of words in the smallest data line
        Some(4 << ((ctr >> 16) & 0xF))
    }

    pub fn clean_line(addr: usize) {
        unsafe {
            core::arch::asm!("dc cvac, {}", in(reg) addr, options(nostack, preserves_flags));
        }
    }

    pub fn clean_invalidate_line(addr: usize) {
        unsafe {
            core::arch::asm!("dc civac, {}", in(reg) addr, options(nostack, preserves_flags));
        }
    }

    #[cfg(bare_metal)]
    struct Aarch64;

    #[cfg(bare_metal)]
    impl super::SetWay for Aarch64 {
        fn read_clidr() -> u32 {
            let v: u64;
            unsafe {
                core::arch::asm!("mrs {}, clidr_el1", out(reg) v, options(nomem, nostack, preserves_flags));
            }
            v as u32
        }

        fn select_level(level: u32) {
            unsafe {
                core::arch::asm!("msr csselr_el1, {}", in(reg) level as u64, options(nostack, preserves_flags));
            }
        }

        fn read_ccsidr() -> u32 {
            let v: u64;
            unsafe {
                core::arch::asm!("mrs {}, ccsidr_el1", out(reg) v, options(nomem, nostack, preserves_flags));
            }
            v as u32
        }

        fn by_set_way(value: u32, invalidate: bool) {
            let value = value as u64;
            unsafe {
                if invalidate {
                    core::arch::asm!("dc cisw, {}", in(reg) value, options(nostack, preserves_flags));
                } else {
                    core::arch::asm!("dc csw, {}", in(reg) value, options(nostack, preserves_flags));
                }
            }
        }
    }

    pub fn clean_all() {
        #[cfg(bare_metal)]
        super::walk_set_way::<Aarch64>(false);
    }

    pub fn clean_invalidate_all() {
        #[cfg(bare_metal)]
        super::walk_set_way::<Aarch64>(true);
    }
}

#[cfg(target_arch = "arm")]
mod arch {
    #[cfg(bare_metal)]
    pub fn probe_line_size() -> Option<usize> {
        let ctr: u32;
        unsafe {
            core::arch::asm!("mrc p15, 0, {}, c0, c0, 1", out(reg) ctr, options(nomem, nostack, preserves_flags));
        }
        Some(4 << ((ctr >> 16) & 0xF))
    }

    #[cfg(not(bare_metal))]
    pub fn probe_line_size() -> Option<usize> {
        None
    }

    pub fn clean_line(addr: usize) {
        #[cfg(bare_metal)]
        unsafe {
            // DCCMVAC
            core::arch::asm!("mcr p15, 0, {}, c7, c10, 1", in(reg) addr, options(nostack, preserves_flags));
        }

        #[cfg(not(bare_metal))]
        let _ = addr;
    }

    pub fn clean_invalidate_line(addr: usize) {
        #[cfg(bare_metal)]
        unsafe {
            // DCCIMVAC
            core::arch::asm!("mcr p15, 0, {}, c7, c14, 1", in(reg) addr, options(nostack, preserves_flags));
        }

        #[cfg(not(bare_metal))]
        let _ = addr;
    }

    #[cfg(bare_metal)]
    struct ArmV7;

    #[cfg(bare_metal)]
    impl super::SetWay for ArmV7 {
        fn read_clidr() -> u32 {
            let v: u32;
            unsafe {
                core::arch::asm!("mrc p15, 1, {}, c0, c0, 1", out(reg) v, options(nomem, nostack, preserves_flags));
            }
            v
        }

        fn select_level(level: u32) {
            unsafe {
                core::arch::asm!("mcr p15, 2, {}, c0, c0, 0", in(reg) level, options(nostack, preserves_flags));
            }
        }

        fn read_ccsidr() -> u32 {
            let v: u32;
            unsafe {
                core::arch::asm!("mrc p15, 1, {}, c0, c0, 0", out(reg) v, options(nomem, nostack, preserves_flags));
            }
            v
        }

        fn by_set_way(value: u32, invalidate: bool) {
            unsafe {
                if invalidate {
                    // DCCISW
                    core::arch::asm!("mcr p15, 0, {}, c7, c14, 2", in(reg) value, options(nostack, preserves_flags));
                } else {
                    // DCCSW
                    core::arch::asm!("mcr p15, 0, {}, c7, c10, 2", in(reg) value, options(nostack, preserves_flags));
                }
            }
        }
    }

    pub fn clean_all() {
        #[cfg(bare_metal)]
        super::walk_set_way::<ArmV7>(false);
    }

    pub fn clean_invalidate_all() {
        #[cfg(bare_metal)]
        super::walk_set_way::<ArmV7>(true);
    }
}

#[cfg(target_arch = "x86_64")]
mod arch {
    pub fn probe_line_size() -> Option<usize> {
        // CPUID.01H:EBX[15:8] is the CLFLUSH line size in quadwords
        #[allow(unused_unsafe)]
        let leaf = unsafe { core::arch::x86_64::__cpuid(1) };
        match ((leaf.ebx >> 8) & 0xFF) as usize {
            0 => None,
            quads => Some(quads * 8),
        }
    }

    pub fn clean_line(addr: usize) {
        unsafe {
            core::arch::asm!("clflush [{}]", in(reg) addr, options(nostack, preserves_flags));
        }
    }

    pub fn clean_invalidate_line(addr: usize) {
        clean_line(addr);
    }

    pub fn clean_all() {
        #[cfg(bare_metal)]
        unsafe {
            core::arch::asm!("wbinvd", options(nostack, preserves_flags));
        }
    }

    pub fn clean_invalidate_all() {
        clean_all();
    }
}

#[cfg(not(any(target_arch = "aarch64", target_arch = "arm", target_arch = "x86_64")))]
mod arch {
    pub fn probe_line_size() -> Option<usize> {
        None
    }

    pub fn clean_line(_addr: usize) {}

    pub fn clean_invalidate_line(_addr: usize) {}

    pub fn clean_all() {}

    pub fn clean_invalidate_all() {}
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;

    #[test]
    fn test_line_size_is_power_of_two() {
        let line = line_size();
        assert!(line >= 16);
        assert!(line.is_power_of_two());
        assert_eq!(line, line_size());
    }

    #[test]
    fn test_for_each_line_covers_unaligned_range() {
        let line = line_size();
        let base = 16 * line;
        let mut lines = vec::Vec::new();

        for_each_line(base + 1, line, |p| lines.push(p));
        assert_eq!(lines, vec![base, base + line]);

        lines.clear();
        for_each_line(base, 0, |p| lines.push(p));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_range_ops_preserve_contents() {
        let mut buf = vec![0u8; 4096];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = i as u8;
        }

        let addr = buf.as_ptr() as usize;
        flush_range(addr + 3, 1000);
        invalidate_range(addr + 3, 1000);
        flush_all();
        invalidate_all();

        assert!(buf.iter().enumerate().all(|(i, &b)| b == i as u8));
    }
}
