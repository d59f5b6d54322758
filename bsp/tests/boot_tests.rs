//! Full bring-up on a host-backed board

mod common;

use common::*;
use ironboard_bsp::{BoardConfig, GeometryError, InitError, MemoryGeometry};
use ironboard_hwinit::time;

// One test: bring-up is once per process.
#[test]
fn test_board_boots_once() {
    let config = hosted_board(true);
    assert!(ironboard_bsp::board().is_none());
    assert!(ironboard_bsp::peripheral("TIMER").is_none());

    // a rejected config changes nothing and leaves init open
    let cramped: &'static BoardConfig = Box::leak(Box::new(BoardConfig {
        geometry: MemoryGeometry {
            image_size: RAM_SIZE - STACK_SIZE - 0x800,
            ..config.geometry
        },
        ..*config
    }));
    assert_eq!(
        unsafe { ironboard_bsp::try_init(cramped) },
        Err(InitError::Geometry(GeometryError::HeapTooSmall))
    );
    assert!(!dma_pool::default().is_initialized());
    assert!(!ironboard_bsp::heap::is_heap_initialized());
    assert!(ironboard_bsp::board().is_none());

    unsafe { ironboard_bsp::try_init(config) }.expect("Should bring the board up");

    let board = ironboard_bsp::board().expect("Should record the board");
    assert!(std::ptr::eq(board, config));
    assert_eq!(time::tick_frequency(), TIMER_HZ);

    // DMA: default region covers the board window
    let dma = dma_pool::default();
    assert_eq!(dma.start(), config.geometry.dma_start);
    assert_eq!(dma.size(), DMA_SIZE);
    assert!(dma.is_cached());

    let addr = dma_pool::alloc(b"rx descriptor", 32);
    let mut out = [0u8; 13];
    dma_pool::read(addr, 0, &mut out);
    assert_eq!(&out, b"rx descriptor");
    dma_pool::free(addr);

    // heap: between image and stack
    let stats = ironboard_bsp::heap::heap_stats().expect("Should have a heap");
    assert_eq!(stats.base, config.geometry.ram_start + IMAGE_SIZE);
    assert_eq!(stats.size, RAM_SIZE - IMAGE_SIZE - STACK_SIZE);
    assert_eq!(stats.used, 0);
    assert!(ironboard_bsp::heap::is_heap_initialized());

    // peripherals: validated blocks by name
    let timer = ironboard_bsp::peripheral("TIMER").expect("Should find TIMER");
    let ctrl = timer.reg::<u32>(0x4);
    ctrl.write(0x5);
    ctrl.set(8);
    assert_eq!(ctrl.read(), 0x105);
    assert!(ironboard_bsp::peripheral("UART1").is_none());

    assert_eq!(
        unsafe { ironboard_bsp::try_init(config) },
        Err(InitError::AlreadyInitialized)
    );
}
