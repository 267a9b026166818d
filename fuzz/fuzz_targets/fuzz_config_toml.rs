//! Fuzz target for propforge.toml parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_config::ForgeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ForgeConfig::parse_toml(text);
    }
});
