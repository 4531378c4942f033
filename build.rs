//! Build script for mkb
//!
//! Embeds version and target information for `--version` style output.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(version) = env::var("CARGO_PKG_VERSION") {
        println!("cargo:rustc-env=MKB_VERSION={}", version);
    }
    if let Ok(target) = env::var("TARGET") {
        println!("cargo:rustc-env=MKB_TARGET={}", target);
    }
}
