//! Fatal error path.
//!
//! Configuration and misuse errors have nowhere to go on bare metal. Every
//! such error ends here: we print a diagnostic naming the operation and the
//! offending address/size, then hand over to the installed handler.
//!
//! The default handler panics, which is what hosted test builds want (the
//! failure is observable with `#[should_panic]`). Boards install
//! [`halt_handler`] or their own reset logic at boot.

use core::fmt;

use crate::sync::Hook;

/// Terminal handler: never returns.
pub type FatalHandler = fn(&str, fmt::Arguments<'_>) -> !;

static HANDLER: Hook<FatalHandler> = Hook::new();

/// Install the terminal handler used by [`fatal`].
pub fn set_handler(handler: FatalHandler) {
    HANDLER.install(handler);
}

/// Report an unrecoverable error and stop.
#[cold]
pub fn fatal(op: &str, detail: fmt::Arguments<'_>) -> ! {
    crate::hwlog!("FATAL", "{}: {}", op, detail);

    match HANDLER.get() {
        Some(handler) => handler(op, detail),
        None => panic!("{}: {}", op, detail),
    }
}

/// Handler that parks the CPU forever.
pub fn halt_handler(_op: &str, _detail: fmt::Arguments<'_>) -> ! {
    crate::cpu::halt()
}

/// `fatal!("Region::free", "double free at {:#x}", addr)`
#[macro_export]
macro_rules! fatal {
    ($op:expr, $($arg:tt)*) => {
        $crate::fatal::fatal($op, ::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic(expected = "Region::free: free of unallocated address 0x1000")]
    fn test_default_handler_panics_with_diagnostic() {
        crate::fatal!("Region::free", "free of unallocated address {:#x}", 0x1000usize);
    }
}
