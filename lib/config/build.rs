use serde::Deserialize;
use std::{collections::BTreeMap, env, fs, path::PathBuf};

/// Layout of `driver.json`.
#[derive(Deserialize)]
struct DriverFlags {
    strings: BTreeMap<String, String>,
    numbers: BTreeMap<String, String>,
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let flags_path = PathBuf::from(manifest_dir).join("../../driver.json");
    let flags_str = fs::read_to_string(&flags_path)
        .unwrap_or_else(|err| panic!("Unable to read {}: {}", flags_path.display(), err));
    let flags: DriverFlags = serde_json::from_str(&flags_str)
        .unwrap_or_else(|err| panic!("Malformed driver.json: {}", err));
    make_flags(&flags);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../driver.json");
}

fn parse_number(key: &str, value: &str) -> usize {
    let clean = value.trim().replace('_', "");
    let parsed = match clean.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => clean.parse::<usize>(),
    };
    parsed.unwrap_or_else(|err| panic!("Invalid number for '{}': {:?} ({})", key, value, err))
}

fn make_flags(flags: &DriverFlags) {
    let mut s = String::new();
    for (key, value) in &flags.strings {
        s += format!("pub const {}: &str = {:?};\n", key, value).as_str();
    }
    for (key, value) in &flags.numbers {
        s += format!("pub const {}: usize = {};\n", key, parse_number(key, value)).as_str();
    }
    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(PathBuf::from(out_dir).join("build_flags.rs"), s).unwrap();
}
