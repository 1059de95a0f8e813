use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    // crates/card-connect-app -> workspace root
    let version_file = manifest_dir
        .ancestors()
        .nth(2)
        .expect("app crate lives two levels below the workspace root")
        .join("VERSION");

    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = contents.trim();
    if version.is_empty() {
        panic!("{} is empty", version_file.display());
    }

    println!("cargo:rustc-env=CARD_CONNECT_VERSION={version}");
}
