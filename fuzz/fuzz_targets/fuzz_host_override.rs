//! Fuzz target for URL host/port rewriting.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pf_redact::HostOverride;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    url: &'a str,
    host: &'a str,
    port: u16,
}

fuzz_target!(|input: Input<'_>| {
    let rule = HostOverride::new("spring.datasource.url", input.host, input.port);
    if let Some(rewritten) = rule.rewrite(input.url) {
        // Rewriting is stable once applied.
        if rule.validate().is_ok() {
            assert_eq!(rule.rewrite(&rewritten).as_deref(), Some(rewritten.as_str()));
        }
    }
});
