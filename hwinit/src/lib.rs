//! Hardware Access Layer
//!
//! The leaf of the board stack. Everything that touches a physical address,
//! a cache line or a CPU counter lives here; the DMA allocator and the board
//! packages build on top.
//!
//! # Architecture
//!
//! ```text
//!   board package (bsp)
//!        │  init, geometry, heap
//!        ▼
//!   dma-pool  ───────────────┐
//!        │ copy in/out       │ flush / invalidate
//!        ▼                   ▼
//!   reg (MMIO)  ──────►  cpu::cache / cpu::barriers
//!        │ waits
//!        ▼
//!   time, sched, sync::Signal
//! ```
//!
//! # Register Access
//!
//! ```ignore
//! use ironboard_hwinit::reg::RegisterBlock;
//!
//! let ccm = unsafe { RegisterBlock::new(CCM_BASE, 0x4000) };
//! let ccgr1 = ccm.reg::<u32>(0x6C);
//! ccgr1.set_n(26, 0b11, 0b11);                      // clock on
//! if !ccgr1.wait_for(Duration::from_millis(1), 26, 0b11, 0b11) {
//!     return Err(DriverError::ClockTimeout);
//! }
//! ```
//!
//! # Runtime Hooks
//!
//! The crate has no runtime of its own. The board installs:
//!
//! - a console sink (`serial::set_console`)
//! - a clock source or counter rate (`time::set_source`, `time::set_tick_frequency`)
//! - the scheduler yield (`sched::set_yield_hook`)
//! - the terminal handler for fatal errors (`fatal::set_handler`)
//!
//! # What This Crate Does NOT Do
//!
//! - Allocate memory
//! - Interrupt controller or exception vector setup
//! - Device-specific register programming

#![no_std]

pub mod cpu;
pub mod fatal;
pub mod reg;
pub mod sched;
pub mod serial;
pub mod sync;
pub mod time;

// ═══════════════════════════════════════════════════════════════════════════
// CPU RE-EXPORTS
// ═══════════════════════════════════════════════════════════════════════════

pub use cpu::{barriers, cache, tsc};
pub use cpu::{halt, wait_for_interrupt};

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER RE-EXPORTS
// ═══════════════════════════════════════════════════════════════════════════

pub use reg::{Register, RegisterBlock, RegisterError, RegisterValue};

// ═══════════════════════════════════════════════════════════════════════════
// SYNC / TIME RE-EXPORTS
// ═══════════════════════════════════════════════════════════════════════════

pub use sync::{Hook, Signal};
pub use time::Deadline;

/// True when built for a target we own outright (no OS underneath).
///
/// Board glue uses this to decide whether parking the CPU is an acceptable
/// answer to a fatal error.
pub const fn is_bare_metal() -> bool {
    cfg!(bare_metal)
}
