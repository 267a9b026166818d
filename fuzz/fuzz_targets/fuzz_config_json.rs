//! Fuzz target for propforge.json parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_config::{validate_config, ForgeConfig};

fuzz_target!(|data: &[u8]| {
    // Parsing and validation should only ever return errors
    if let Ok(config) = serde_json::from_slice::<ForgeConfig>(data) {
        let _ = validate_config(&config);
    }
});
