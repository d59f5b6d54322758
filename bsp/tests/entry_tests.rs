//! The generated boot entry stops on a broken board

use ironboard_bsp::{BoardConfig, MemoryGeometry};

static BROKEN: BoardConfig = BoardConfig {
    name: "broken",
    geometry: MemoryGeometry {
        ram_start: 0x8000_0000,
        ram_size: 0,
        ram_stack_offset: 0x100,
        image_size: 0x1000,
        dma_start: 0x0090_0000,
        dma_size: 0x2_0000,
    },
    peripherals: &[],
    peripheral_cache: false,
    dma_cache: false,
    timer_hz: 0,
};

ironboard_bsp::board_entry!(BROKEN);

#[test]
#[should_panic(expected = "bsp::init: memory geometry: ram window is empty (board broken)")]
fn test_entry_with_broken_board_is_fatal() {
    hwinit();
}
