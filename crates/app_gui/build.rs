use std::env;

fn main() {
    let version =
        env::var("FUNDUS_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=FUNDUS_VERSION={version}");
    println!("cargo:rerun-if-env-changed=FUNDUS_VERSION");
}
