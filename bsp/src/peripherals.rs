//! Peripheral map.
//!
//! Each board lists the MMIO windows its drivers may touch. The table is
//! checked once at boot; after that drivers look blocks up by name.

use core::fmt;

use ironboard_hwinit::reg::{RegisterBlock, RegisterError};

use crate::geometry::Window;

/// One MMIO window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralDesc {
    pub name: &'static str,
    pub base: usize,
    pub size: usize,
}

impl PeripheralDesc {
    pub const fn new(name: &'static str, base: usize, size: usize) -> Self {
        Self { name, base, size }
    }

    #[inline]
    pub const fn window(&self) -> Window {
        Window {
            start: self.base,
            size: self.size,
        }
    }

    /// Register block over this window.
    ///
    /// # Safety
    /// The window must really be device memory on the running board.
    pub unsafe fn block(&self) -> Result<RegisterBlock, RegisterError> {
        unsafe { RegisterBlock::try_new(self.base, self.size) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    Invalid {
        name: &'static str,
        err: RegisterError,
    },
    Duplicate {
        name: &'static str,
    },
    Overlap {
        name: &'static str,
        other: &'static str,
    },
}

impl fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { name, err } => write!(f, "peripheral {}: {}", name, err),
            Self::Duplicate { name } => write!(f, "peripheral {} listed twice", name),
            Self::Overlap { name, other } => {
                write!(f, "peripheral {} overlaps {}", name, other)
            }
        }
    }
}

/// Check every entry is a usable register window, names are unique and no
/// two windows overlap.
pub fn validate(table: &[PeripheralDesc]) -> Result<(), PeripheralError> {
    for (i, p) in table.iter().enumerate() {
        // SAFETY: try_new only checks arithmetic, nothing is accessed
        unsafe { p.block() }.map_err(|err| PeripheralError::Invalid { name: p.name, err })?;

        for q in &table[..i] {
            if q.name == p.name {
                return Err(PeripheralError::Duplicate { name: p.name });
            }
            if q.window().overlaps(&p.window()) {
                return Err(PeripheralError::Overlap {
                    name: p.name,
                    other: q.name,
                });
            }
        }
    }
    Ok(())
}

/// Look up a window by name.
pub fn find<'a>(table: &'a [PeripheralDesc], name: &str) -> Option<&'a PeripheralDesc> {
    table.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[PeripheralDesc] = &[
        PeripheralDesc::new("UART1", 0x0202_0000, 0x4000),
        PeripheralDesc::new("UART2", 0x021E_8000, 0x4000),
        PeripheralDesc::new("WDOG1", 0x020B_C000, 0x4000),
    ];

    #[test]
    fn test_valid_table() {
        assert_eq!(validate(TABLE), Ok(()));
        assert_eq!(find(TABLE, "UART2").map(|p| p.base), Some(0x021E_8000));
        assert!(find(TABLE, "UART9").is_none());
    }

    #[test]
    fn test_invalid_entries() {
        let t = [PeripheralDesc::new("NULL", 0, 0x1000)];
        assert_eq!(
            validate(&t),
            Err(PeripheralError::Invalid {
                name: "NULL",
                err: RegisterError::NullBase
            })
        );

        let t = [PeripheralDesc::new("EMPTY", 0x1000, 0)];
        assert!(matches!(validate(&t), Err(PeripheralError::Invalid { name: "EMPTY", .. })));
    }

    #[test]
    fn test_duplicates_and_overlaps() {
        let t = [
            PeripheralDesc::new("A", 0x1000, 0x1000),
            PeripheralDesc::new("A", 0x8000, 0x1000),
        ];
        assert_eq!(validate(&t), Err(PeripheralError::Duplicate { name: "A" }));

        let t = [
            PeripheralDesc::new("A", 0x1000, 0x1000),
            PeripheralDesc::new("B", 0x1800, 0x1000),
        ];
        assert_eq!(
            validate(&t),
            Err(PeripheralError::Overlap { name: "B", other: "A" })
        );
    }

    #[test]
    fn test_block_resolves_registers() {
        let uart = unsafe { TABLE[0].block() }.unwrap();
        assert_eq!(uart.reg::<u32>(0x80).addr(), 0x0202_0080);
    }
}
