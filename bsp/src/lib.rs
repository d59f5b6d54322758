//! Board Support
//!
//! Ties the hardware layer and the DMA allocator to a concrete machine: the
//! physical memory layout, the peripheral map, the runtime heap and the boot
//! entry the runtime calls first.
//!
//! # Usage
//!
//! ```ignore
//! #![no_std]
//! #![no_main]
//!
//! use ironboard_bsp::boards::usbarmory_mk2;
//!
//! ironboard_bsp::board_entry!(usbarmory_mk2::CONFIG);
//!
//! #[global_allocator]
//! static ALLOCATOR: ironboard_bsp::heap::HeapAllocator =
//!     ironboard_bsp::heap::HeapAllocator::new();
//!
//! fn driver_init() {
//!     let uart = ironboard_bsp::peripheral("UART2").unwrap();
//!     let ring = dma_pool::reserve(64 * 16, 64);
//!     // ...
//! }
//! ```
//!
//! # Adding a Board
//!
//! Write a `BoardConfig` constant: memory geometry, peripheral table, cache
//! policy and counter rate. `BoardConfig::check` validates it without
//! touching hardware, which is what the board tests do.

#![no_std]

pub mod boards;
pub mod geometry;
pub mod heap;
pub mod init;
pub mod peripherals;

pub use geometry::{GeometryError, MemoryGeometry, Window};
pub use heap::{HeapAllocator, HeapError, HeapStats, RuntimeHeap};
pub use init::{board, init, peripheral, try_init, BoardConfig, InitError};
pub use peripherals::{PeripheralDesc, PeripheralError};
