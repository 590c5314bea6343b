//! Embeds the Common-Controls v6 manifest dependency into MSVC binaries.
//!
//! `TaskDialog` only exists in comctl32 v6, which Windows loads for a process
//! only when its manifest asks for it.

use std::env;

const COMMON_CONTROLS_DEPENDENCY: &str = "type='win32' \
     name='Microsoft.Windows.Common-Controls' \
     version='6.0.0.0' \
     processorArchitecture='*' \
     publicKeyToken='6595b64144ccf1df' \
     language='*'";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    if target_os == "windows" && target_env == "msvc" {
        println!("cargo:rustc-link-arg-bins=/MANIFEST:EMBED");
        println!("cargo:rustc-link-arg-bins=/MANIFESTDEPENDENCY:{COMMON_CONTROLS_DEPENDENCY}");
    }
}
