//! Common test utilities: board configs backed by leaked host memory

#![allow(dead_code)]

use ironboard_bsp::{BoardConfig, MemoryGeometry, PeripheralDesc};

pub const RAM_SIZE: usize = 0x2_0000;
pub const IMAGE_SIZE: usize = 0x1000;
pub const STACK_SIZE: usize = 0x1000;
pub const DMA_SIZE: usize = 0x8000;
pub const TIMER_HZ: u64 = 1_000_000;

fn leak(size: usize) -> usize {
    Box::leak(vec![0u64; size / 8].into_boxed_slice()).as_mut_ptr() as usize
}

/// A board whose RAM, DMA window and one "TIMER" peripheral are host memory.
pub fn hosted_board(dma_cache: bool) -> &'static BoardConfig {
    let peripherals: &'static [PeripheralDesc] =
        Box::leak(vec![PeripheralDesc::new("TIMER", leak(0x100), 0x100)].into_boxed_slice());

    Box::leak(Box::new(BoardConfig {
        name: "hosted",
        geometry: MemoryGeometry {
            ram_start: leak(RAM_SIZE),
            ram_size: RAM_SIZE,
            ram_stack_offset: STACK_SIZE,
            image_size: IMAGE_SIZE,
            dma_start: leak(DMA_SIZE),
            dma_size: DMA_SIZE,
        },
        peripherals,
        peripheral_cache: false,
        dma_cache,
        timer_hz: TIMER_HZ,
    }))
}
