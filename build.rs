use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let rustc_version = Command::new("rustc")
        .arg("--version")
        .output()
        .expect("Failed to execute rustc");
    let rustc_version = String::from_utf8_lossy(&rustc_version.stdout);
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("rustc_version.rs");
    let mut f = File::create(&dest_path).unwrap();

    write!(
        f,
        "pub const RUSTC_VERSION: &str = \"{}\";",
        rustc_version.trim_end()
    )
    .unwrap();
}
