//! Fuzz target for property parsing and tree building.
//!
//! Parsing must accept any UTF-8 text. Building the document and rendering
//! YAML may fail on conflicting keys but must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_core::document::Document;
use pf_core::properties::parse_properties;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = parse_properties(text);
    if let Ok(doc) = Document::from_properties(&parsed.map) {
        assert_eq!(doc.leaf_count(), parsed.map.len());
        let _ = doc.to_yaml_string();
    }
});
