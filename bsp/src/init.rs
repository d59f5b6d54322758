//! Board bring-up.
//!
//! `init` runs once, from the boot entry, before anything else in the
//! system. It works without a heap: everything it touches is static.
//!
//! ## Sequence
//!
//! 1. Fatal handler (halt loop on bare metal)
//! 2. Geometry and peripheral table checks
//! 3. Runtime heap over the heap window
//! 4. Default DMA region over the board window
//! 5. Register cache policy, counter rate

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use dma_pool::DmaError;
use ironboard_hwinit::reg::{self, RegisterBlock};
use ironboard_hwinit::{fatal, hwlog, time};
use spin::Once;

use crate::geometry::{GeometryError, MemoryGeometry, Window};
use crate::heap::{HeapError, RUNTIME_HEAP};
use crate::peripherals::{self, PeripheralDesc, PeripheralError};

/// Everything the runtime needs to know about a board.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub name: &'static str,
    pub geometry: MemoryGeometry,
    pub peripherals: &'static [PeripheralDesc],
    /// Peripheral windows are mapped cacheable.
    pub peripheral_cache: bool,
    /// The DMA window is mapped cacheable.
    pub dma_cache: bool,
    /// Architecture counter rate in Hz, 0 to ask the CPU.
    pub timer_hz: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    AlreadyInitialized,
    Geometry(GeometryError),
    Peripheral(PeripheralError),
    /// A peripheral window overlaps RAM or the DMA window.
    PeripheralInMemory { name: &'static str },
    Dma(DmaError),
    Heap(HeapError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::AlreadyInitialized => write!(f, "board already initialized"),
            InitError::Geometry(e) => write!(f, "memory geometry: {}", e),
            InitError::Peripheral(e) => write!(f, "{}", e),
            InitError::PeripheralInMemory { name } => {
                write!(f, "peripheral {} overlaps ram or dma window", name)
            }
            InitError::Dma(e) => write!(f, "dma region: {}", e),
            InitError::Heap(e) => write!(f, "{}", e),
        }
    }
}

impl From<GeometryError> for InitError {
    fn from(e: GeometryError) -> Self {
        InitError::Geometry(e)
    }
}

impl From<PeripheralError> for InitError {
    fn from(e: PeripheralError) -> Self {
        InitError::Peripheral(e)
    }
}

impl BoardConfig {
    /// Validate the whole configuration without touching hardware.
    pub fn check(&self) -> Result<(), InitError> {
        self.geometry.validate()?;
        peripherals::validate(self.peripherals)?;

        let ram = Window {
            start: self.geometry.ram_start,
            size: self.geometry.ram_size,
        };
        let dma = self.geometry.dma()?;

        if let Some(p) = self
            .peripherals
            .iter()
            .find(|p| p.window().overlaps(&ram) || p.window().overlaps(&dma))
        {
            return Err(InitError::PeripheralInMemory { name: p.name });
        }
        Ok(())
    }

    /// Register block for the named peripheral.
    ///
    /// # Safety
    /// The table must describe the running board.
    pub unsafe fn peripheral(&self, name: &str) -> Option<RegisterBlock> {
        let desc = peripherals::find(self.peripherals, name)?;
        unsafe { desc.block() }.ok()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BOOT
// ═══════════════════════════════════════════════════════════════════════════

static STARTED: AtomicBool = AtomicBool::new(false);
static BOARD: Once<&'static BoardConfig> = Once::new();

/// Bring the board up, reporting failures.
///
/// Nothing is touched unless the whole configuration checks out. A failed
/// call leaves the board uninitialized so a corrected config can be tried.
///
/// # Safety
/// `config` must describe the running machine: RAM and DMA windows are
/// written to, peripheral windows become reachable through safe handles.
pub unsafe fn try_init(config: &'static BoardConfig) -> Result<(), InitError> {
    config.check()?;
    let g = &config.geometry;
    let heap = g.heap()?;

    if STARTED.swap(true, Ordering::AcqRel) {
        return Err(InitError::AlreadyInitialized);
    }

    if let Err(e) = unsafe { bring_up(config, heap) } {
        STARTED.store(false, Ordering::Release);
        return Err(e);
    }

    BOARD.call_once(|| config);

    hwlog!(
        "BSP",
        "{}: ram {:#x}+{:#x} heap {:#x}+{:#x} dma {:#x}+{:#x}{}",
        config.name,
        g.ram_start,
        g.ram_size,
        heap.start,
        heap.size,
        g.dma_start,
        g.dma_size,
        if config.dma_cache { " (cached)" } else { "" }
    );
    hwlog!("BSP", "{} peripherals", config.peripherals.len());
    Ok(())
}

/// Heap first: it is the only step that can refuse a checked config.
unsafe fn bring_up(config: &BoardConfig, heap: Window) -> Result<(), InitError> {
    let g = &config.geometry;

    unsafe { RUNTIME_HEAP.init(heap.start, heap.size) }.map_err(InitError::Heap)?;

    let dma = dma_pool::default();
    unsafe { dma.init_identity(g.dma_start, g.dma_size) }.map_err(InitError::Dma)?;
    dma.set_cached(config.dma_cache);

    reg::set_peripheral_cached(config.peripheral_cache);
    if config.timer_hz != 0 {
        time::set_tick_frequency(config.timer_hz);
    }
    Ok(())
}

/// Bring the board up. Any failure, including a second call, is fatal.
///
/// # Safety
/// See [`try_init`].
pub unsafe fn init(config: &'static BoardConfig) {
    if ironboard_hwinit::is_bare_metal() {
        fatal::set_handler(fatal::halt_handler);
    }

    if let Err(e) = unsafe { try_init(config) } {
        fatal!("bsp::init", "{} (board {})", e, config.name);
    }
}

/// The running board, once [`init`] has completed.
pub fn board() -> Option<&'static BoardConfig> {
    BOARD.get().copied()
}

/// Register block for a peripheral of the running board.
pub fn peripheral(name: &str) -> Option<RegisterBlock> {
    // SAFETY: init accepted the table as describing this machine
    board().and_then(|b| unsafe { b.peripheral(name) })
}

/// Define the boot entry point for a board.
///
/// ```ignore
/// ironboard_bsp::board_entry!(ironboard_bsp::boards::usbarmory_mk2::CONFIG);
/// ```
///
/// expands to a parameterless `extern "C" fn hwinit()` the runtime calls
/// before anything else.
#[macro_export]
macro_rules! board_entry {
    ($config:path) => {
        #[no_mangle]
        pub extern "C" fn hwinit() {
            // SAFETY: the config is the one this image is built for
            unsafe { $crate::init(&$config) }
        }
    };
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::boards::usbarmory_mk2;
    use std::string::ToString;

    #[test]
    fn test_check_rejects_peripheral_in_ram() {
        static BAD: &[PeripheralDesc] = &[PeripheralDesc::new("ROGUE", 0x8000_1000, 0x1000)];
        let cfg = BoardConfig {
            peripherals: BAD,
            ..usbarmory_mk2::CONFIG
        };
        assert_eq!(cfg.check(), Err(InitError::PeripheralInMemory { name: "ROGUE" }));
    }

    #[test]
    fn test_check_rejects_peripheral_in_dma_window() {
        static BAD: &[PeripheralDesc] = &[PeripheralDesc::new("ROGUE", 0x0091_0000, 0x1000)];
        let cfg = BoardConfig {
            peripherals: BAD,
            ..usbarmory_mk2::CONFIG
        };
        assert_eq!(cfg.check(), Err(InitError::PeripheralInMemory { name: "ROGUE" }));
    }

    #[test]
    fn test_check_reports_geometry_first() {
        let cfg = BoardConfig {
            geometry: MemoryGeometry {
                dma_size: 0,
                ..usbarmory_mk2::GEOMETRY
            },
            ..usbarmory_mk2::CONFIG
        };
        assert_eq!(cfg.check(), Err(InitError::Geometry(GeometryError::EmptyDma)));
        assert_eq!(
            cfg.check().unwrap_err().to_string(),
            "memory geometry: dma window is empty"
        );
    }

    #[test]
    fn test_failed_check_leaves_board_untouched() {
        static TINY_HEAP: BoardConfig = BoardConfig {
            geometry: MemoryGeometry {
                image_size: usbarmory_mk2::GEOMETRY.ram_size - 0x100 - 0x800,
                ..usbarmory_mk2::GEOMETRY
            },
            ..usbarmory_mk2::CONFIG
        };
        let cfg = &TINY_HEAP;
        let err = Err(InitError::Geometry(GeometryError::HeapTooSmall));
        assert_eq!(cfg.check(), err);

        assert_eq!(unsafe { try_init(cfg) }, err);
        assert!(!STARTED.load(Ordering::Acquire));
        assert!(!RUNTIME_HEAP.is_initialized());
        assert!(!dma_pool::default().is_initialized());
        assert!(board().is_none());
    }

    #[test]
    fn test_peripheral_lookup_by_name() {
        let uart = unsafe { usbarmory_mk2::CONFIG.peripheral("UART2") }.unwrap();
        assert_eq!(uart.base(), 0x021e_8000);
        assert!(unsafe { usbarmory_mk2::CONFIG.peripheral("UART9") }.is_none());
    }
}
