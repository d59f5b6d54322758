//! Serial debug output.
//!
//! Minimal polled console for boot and driver diagnostics. No buffering, no
//! interrupts, no heap. Boards install their UART as the sink with
//! [`set_console`]; until then x86_64 bare-metal targets fall back to COM1
//! and everything else is discarded.

use core::fmt;

use crate::sync::Hook;

/// Console sink: receives raw bytes, must not allocate.
pub type ConsoleSink = fn(&[u8]);

static CONSOLE: Hook<ConsoleSink> = Hook::new();

/// Route console output to `sink`.
pub fn set_console(sink: ConsoleSink) {
    CONSOLE.install(sink);
}

/// Drop the installed sink and return to the built-in default.
pub fn clear_console() {
    CONSOLE.clear();
}

#[cfg(all(bare_metal, target_arch = "x86_64"))]
mod com1 {
    use crate::reg::port::PortBlock;

    const COM1: PortBlock = PortBlock::new(0x3F8, 8);
    const THR: u16 = 0;
    const LSR: u16 = 5;
    const LSR_TX_EMPTY: u8 = 0x20;

    /// Write byte to COM1. Bounded wait, gives up after ~100 spins.
    #[inline]
    pub fn putc(b: u8) {
        for _ in 0..100 {
            // SAFETY: COM1 is the legacy console UART on every x86 board we boot
            let status = unsafe { COM1.read8(LSR) }.unwrap_or(0);
            if status & LSR_TX_EMPTY != 0 {
                let _ = unsafe { COM1.write8(THR, b) };
                return;
            }
            core::hint::spin_loop();
        }
    }
}

fn default_sink(bytes: &[u8]) {
    #[cfg(all(bare_metal, target_arch = "x86_64"))]
    for &b in bytes {
        com1::putc(b);
    }

    #[cfg(not(all(bare_metal, target_arch = "x86_64")))]
    let _ = bytes;
}

/// Write raw bytes to the console.
#[inline]
pub fn write_bytes(bytes: &[u8]) {
    match CONSOLE.get() {
        Some(sink) => sink(bytes),
        None => default_sink(bytes),
    }
}

#[inline]
pub fn putc(b: u8) {
    write_bytes(&[b]);
}

/// Write string to the console.
pub fn puts(s: &str) {
    write_bytes(s.as_bytes());
}

fn hex_digit(nibble: u8) -> u8 {
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'a' + nibble - 10
    }
}

fn put_hex(val: u64, digits: usize) {
    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..digits {
        let shift = (digits - 1 - i) * 4;
        buf[2 + i] = hex_digit(((val >> shift) & 0xF) as u8);
    }
    write_bytes(&buf[..2 + digits]);
}

/// Write u32 as hex (0x prefix).
pub fn put_hex32(val: u32) {
    put_hex(val as u64, 8);
}

/// Write u64 as hex.
pub fn put_hex64(val: u64) {
    put_hex(val, 16);
}

/// Write u8 as hex (no prefix).
pub fn put_hex8(val: u8) {
    write_bytes(&[hex_digit(val >> 4), hex_digit(val & 0xF)]);
}

#[inline]
pub fn newline() {
    putc(b'\n');
}

/// `core::fmt` adapter over the console.
pub struct SerialWriter;

impl fmt::Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        puts(s);
        Ok(())
    }
}

/// Tagged log line: `hwlog!("DMA", "init {:#x}", base)` prints `[DMA] init 0x...`.
#[macro_export]
macro_rules! hwlog {
    ($tag:expr, $($arg:tt)*) => {{
        use ::core::fmt::Write as _;
        let mut w = $crate::serial::SerialWriter;
        let _ = ::core::write!(w, "[{}] ", $tag);
        let _ = ::core::write!(w, $($arg)*);
        $crate::serial::newline();
    }};
}

/// Tagged log line with a hex value, no formatting machinery involved.
#[macro_export]
macro_rules! hwlog_hex {
    ($tag:expr, $msg:expr, $val:expr) => {{
        $crate::serial::puts("[");
        $crate::serial::puts($tag);
        $crate::serial::puts("] ");
        $crate::serial::puts($msg);
        $crate::serial::put_hex64($val as u64);
        $crate::serial::newline();
    }};
}
