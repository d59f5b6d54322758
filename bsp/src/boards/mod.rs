//! Ready-made board configurations.
//!
//! | Board                 | Arch    | RAM                  | DMA window              |
//! |-----------------------|---------|----------------------|-------------------------|
//! | QEMU microvm          | x86_64  | 0x1000_0000 / 1 GiB  | 0x5000_0000 / 256 MiB   |
//! | USB armory Mk II      | arm     | 0x8000_0000 / 512 MiB| OCRAM 0x0090_0000 / 128 KiB |
//! | QEMU sifive_u (FU540) | riscv64 | 0x8000_0000 / 496 MiB| 0x9F00_0000 / 16 MiB    |

pub mod microvm;
pub mod sifive_u;
pub mod usbarmory_mk2;

use crate::init::BoardConfig;

/// Every shipped configuration.
pub static ALL: &[&BoardConfig] = &[&microvm::CONFIG, &usbarmory_mk2::CONFIG, &sifive_u::CONFIG];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals;

    #[test]
    fn test_shipped_boards_are_valid() {
        for board in ALL {
            assert_eq!(board.geometry.validate(), Ok(()), "{}", board.name);
            assert_eq!(peripherals::validate(board.peripherals), Ok(()), "{}", board.name);
            assert_eq!(board.check(), Ok(()), "{}", board.name);
        }
    }

    #[test]
    fn test_board_names_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
