// SPDX-License-Identifier: GPL-3.0-only

use std::{env, path::PathBuf};

// Link wiring for the DeckLink hardware backend. Only active when the
// `decklink` feature is enabled on a Linux target. The capture shim
// (`libdecklink_capture`) is built alongside the Desktop Video SDK install;
// DECKLINK_SDK_DIR points at the SDK root when it is not on the default
// search path.
fn main() {
    let feature_on = env::var_os("CARGO_FEATURE_DECKLINK").is_some();
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    println!("cargo::rerun-if-env-changed=DECKLINK_SDK_DIR");

    if !feature_on {
        return;
    }
    if target_os != "linux" {
        println!(
            "cargo::warning=decklink feature is Linux-only; building without the hardware backend on {target_os}"
        );
        return;
    }

    let mut search_dirs = vec![PathBuf::from("/usr/local/lib"), PathBuf::from("/usr/lib")];
    if let Ok(root) = env::var("DECKLINK_SDK_DIR").map(PathBuf::from) {
        search_dirs.insert(0, root.join("Linux").join("x86_64").join("lib"));
        search_dirs.insert(0, root.join("lib"));
    }
    for dir in search_dirs.iter().filter(|p| p.exists()) {
        println!("cargo::rustc-link-search=native={}", dir.display());
    }

    println!("cargo::rustc-link-lib=dylib=decklink_capture");
    println!("cargo::rustc-link-lib=dylib=DeckLinkAPI");
}
