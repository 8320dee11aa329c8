// Slipstream FFI - C bindings
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Build script for slipstream-ffi
//!
//! Generates the C header using cbindgen.

fn main() {
    let crate_dir = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: CARGO_MANIFEST_DIR unset: {}", e);
            return;
        }
    };
    let output_file = format!("{}/include/slipstream_generated.h", crate_dir);

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SLIPSTREAM_GENERATED_H")
        .with_cpp_compat(true)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&output_file);
            println!("cargo:rerun-if-changed=src/lib.rs");
        }
        Err(e) => {
            // A stale header is better than a failed library build
            eprintln!("Warning: cbindgen failed: {}", e);
        }
    }
}
