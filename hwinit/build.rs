//! Build script for ironboard-hwinit.
//!
//! Classifies the target so the CPU layer can pick privileged instructions
//! (set/way cache maintenance, `wbinvd`, `hlt`, COM1 port I/O) only when we
//! actually own the machine. Hosted targets get the unprivileged subset.

use std::env;

fn main() {
    let target = env::var("TARGET").unwrap_or_default();
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-check-cfg=cfg(bare_metal)");

    let bare_metal = target_os == "none" || target_os == "uefi" || target.contains("-none");

    if bare_metal {
        println!("cargo:rustc-cfg=bare_metal");
    } else {
        println!(
            "cargo:warning=hwinit: hosted target {} - privileged cache/halt paths disabled",
            target
        );
    }
}
