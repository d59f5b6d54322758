//! QEMU sifive_u (SiFive FU540, riscv64).
//!
//! The SoC has no dedicated DMA memory; the top 16 MiB of DRAM is kept out
//! of the runtime's reach and used as the DMA window instead.

use crate::geometry::MemoryGeometry;
use crate::init::BoardConfig;
use crate::peripherals::PeripheralDesc;

pub const CLINT_BASE: usize = 0x0200_0000;
pub const UART0_BASE: usize = 0x1001_0000;
pub const UART1_BASE: usize = 0x1001_1000;

/// RTCCLK, the `mtime` timebase.
pub const RTCCLK_HZ: u64 = 1_000_000;

pub const PERIPHERALS: &[PeripheralDesc] = &[
    PeripheralDesc::new("CLINT", CLINT_BASE, 0x1_0000),
    PeripheralDesc::new("UART0", UART0_BASE, 0x1000),
    PeripheralDesc::new("UART1", UART1_BASE, 0x1000),
];

pub const GEOMETRY: MemoryGeometry = MemoryGeometry {
    ram_start: 0x8000_0000,
    ram_size: 0x1F00_0000,
    ram_stack_offset: 0x100,
    image_size: 0x40_0000,
    dma_start: 0x9F00_0000,
    dma_size: 0x100_0000,
};

pub static CONFIG: BoardConfig = BoardConfig {
    name: "qemu-sifive_u",
    geometry: GEOMETRY,
    peripherals: PERIPHERALS,
    peripheral_cache: false,
    dma_cache: false,
    timer_hz: RTCCLK_HZ,
};
