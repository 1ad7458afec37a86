use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Copy config and catalog next to the built executable
    copy_to_target("config.json");
    copy_to_target("correct_names.txt");
}

/// Copies a file from the crate root to the target directory so the executable can find it.
fn copy_to_target(name: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    // OUT_DIR is something like target/release/build/cardscan-xxx/out
    // We need to go up to target/release (or target/debug)
    let out_path = Path::new(&out_dir);
    let target_dir = out_path
        .ancestors()
        .nth(3) // Go up 3 levels: out -> hash -> build -> release
        .expect("Could not find target directory");

    let src = Path::new(name);
    if src.exists() {
        let _ = fs::copy(src, target_dir.join(name));
        println!("cargo:rerun-if-changed={}", name);
    }
}
