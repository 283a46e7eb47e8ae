use std::env;
use std::path::PathBuf;

/// Generates `fh_ffi.h` into `OUT_DIR`. Set `FH_FFI_HEADER_DIR` to also copy
/// it somewhere a host project can pick it up.
fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-env-changed=FH_FFI_HEADER_DIR");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let header = PathBuf::from(out_dir).join("fh_ffi.h");

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FH_FFI_H")
        .generate()
    {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=skipping C header generation: {e}");
            return;
        }
    };
    bindings.write_to_file(&header);

    if let Ok(dir) = env::var("FH_FFI_HEADER_DIR") {
        let target = PathBuf::from(dir).join("fh_ffi.h");
        if let Err(e) = std::fs::copy(&header, &target) {
            println!("cargo:warning=cannot copy header to {}: {e}", target.display());
        }
    }
}
