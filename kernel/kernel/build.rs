use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("No out dir"));
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SHELL_BIN");

    // host builds link normally
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
        let link_dir = PathBuf::from("src/arch/link");
        println!("cargo:rustc-link-search={}", out_dir.display());
        for entry in fs::read_dir(link_dir).expect("linker script directory is missing") {
            let entry = entry.expect("could not read linker script directory");
            println!("cargo:rerun-if-changed={}", entry.path().display());
            fs::copy(entry.path(), out_dir.join(entry.file_name()))
                .expect("could not copy linker script");
        }
        println!("cargo:rustc-link-arg-bins=-Tkernel.ld");
    }

    // the shell is built separately and handed to us as a flat binary
    let shell_out = out_dir.join("shell.bin");
    match env::var_os("SHELL_BIN") {
        Some(path) => {
            let path = Path::new(&path);
            println!("cargo:rerun-if-changed={}", path.display());
            fs::copy(path, &shell_out).expect("could not copy shell binary");
        }
        None => fs::write(&shell_out, b"").expect("could not write empty shell binary"),
    }
}
