//! QEMU microvm (x86_64).
//!
//! Guest RAM starts at 256 MiB; the DMA window follows it directly. The
//! virtio-mmio transports are cache coherent and the COM1 console is the
//! built-in default sink, so nothing is installed at boot.

use crate::geometry::MemoryGeometry;
use crate::init::BoardConfig;
use crate::peripherals::PeripheralDesc;

pub const LAPIC_BASE: usize = 0xfee0_0000;
pub const IOAPIC0_BASE: usize = 0xfec0_0000;
pub const IOAPIC1_BASE: usize = 0xfec1_0000;

/// One 512-byte transport per slot.
pub const VIRTIO_MMIO_BASE: usize = 0xfeb0_0000;
pub const VIRTIO_MMIO_SLOT: usize = 0x200;
pub const VIRTIO_NET0_BASE: usize = VIRTIO_MMIO_BASE + 0x2e00;

pub const PERIPHERALS: &[PeripheralDesc] = &[
    PeripheralDesc::new("LAPIC", LAPIC_BASE, 0x1000),
    PeripheralDesc::new("IOAPIC0", IOAPIC0_BASE, 0x1000),
    PeripheralDesc::new("IOAPIC1", IOAPIC1_BASE, 0x1000),
    PeripheralDesc::new("VIRTIO_NET0", VIRTIO_NET0_BASE, VIRTIO_MMIO_SLOT),
];

pub const GEOMETRY: MemoryGeometry = MemoryGeometry {
    ram_start: 0x1000_0000,
    ram_size: 0x4000_0000,
    ram_stack_offset: 0x10_0000,
    image_size: 0x100_0000,
    dma_start: 0x5000_0000,
    dma_size: 0x1000_0000,
};

pub static CONFIG: BoardConfig = BoardConfig {
    name: "qemu-microvm",
    geometry: GEOMETRY,
    peripherals: PERIPHERALS,
    peripheral_cache: false,
    dma_cache: false,
    // TSC rate from CPUID
    timer_hz: 0,
};
