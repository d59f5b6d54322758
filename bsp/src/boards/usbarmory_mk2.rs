//! USB armory Mk II (NXP i.MX6UL / i.MX6ULZ, Cortex-A7).
//!
//! DMA buffers live in the 128 KiB on-chip RAM, mapped without caching, so
//! the region skips cache maintenance.

use crate::geometry::MemoryGeometry;
use crate::init::BoardConfig;
use crate::peripherals::PeripheralDesc;

pub const OCRAM_START: usize = 0x0090_0000;
pub const OCRAM_SIZE: usize = 0x2_0000;

/// i.MX6 AIPS peripherals are 16 KiB apart.
const AIPS_SLOT: usize = 0x4000;

pub const PERIPHERALS: &[PeripheralDesc] = &[
    PeripheralDesc::new("UART1", 0x0202_0000, AIPS_SLOT),
    PeripheralDesc::new("UART2", 0x021e_8000, AIPS_SLOT),
    PeripheralDesc::new("USB1", 0x0218_4000, 0x200),
    PeripheralDesc::new("USB2", 0x0218_4200, 0x200),
    PeripheralDesc::new("ENET1", 0x0218_8000, AIPS_SLOT),
    PeripheralDesc::new("USDHC1", 0x0219_0000, AIPS_SLOT),
    PeripheralDesc::new("USDHC2", 0x0219_4000, AIPS_SLOT),
    PeripheralDesc::new("I2C1", 0x021a_0000, AIPS_SLOT),
    PeripheralDesc::new("OCOTP", 0x021b_c000, AIPS_SLOT),
    PeripheralDesc::new("GPIO1", 0x0209_c000, AIPS_SLOT),
    PeripheralDesc::new("WDOG1", 0x020b_c000, AIPS_SLOT),
    PeripheralDesc::new("CCM", 0x020c_4000, AIPS_SLOT),
    PeripheralDesc::new("SNVS", 0x020c_c000, AIPS_SLOT),
    PeripheralDesc::new("IOMUXC", 0x020e_0000, AIPS_SLOT),
    PeripheralDesc::new("DCP", 0x0228_0000, AIPS_SLOT),
    PeripheralDesc::new("RNGB", 0x0228_4000, AIPS_SLOT),
];

pub const GEOMETRY: MemoryGeometry = MemoryGeometry {
    ram_start: 0x8000_0000,
    ram_size: 0x2000_0000,
    ram_stack_offset: 0x100,
    image_size: 0x40_0000,
    dma_start: OCRAM_START,
    dma_size: OCRAM_SIZE,
};

pub static CONFIG: BoardConfig = BoardConfig {
    name: "usbarmory-mk2",
    geometry: GEOMETRY,
    peripherals: PERIPHERALS,
    peripheral_cache: false,
    dma_cache: false,
    // system counter, 24 MHz crystal
    timer_hz: 24_000_000,
};
