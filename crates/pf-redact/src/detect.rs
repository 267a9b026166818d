//! Advisory detection of credential-like property keys.
//!
//! Extraction is exact-match only. Detection exists so the conversion can
//! warn about keys that look sensitive but are missing from the registry;
//! it never changes a value.

use crate::{PropertyStore, SensitiveKeyRegistry};
use once_cell::sync::Lazy;
use regex::Regex;

// Matched against the last dotted segment only, so `password-policy.enabled`
// style namespaces do not trigger.
static SENSITIVE_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|passwd|secret|token|api[-_]?key|private[-_]?key|credential)")
        .unwrap()
});

/// Whether a dotted key's final segment looks like it holds a credential.
pub fn looks_sensitive(key: &str) -> bool {
    let last = key.rsplit('.').next().unwrap_or(key);
    SENSITIVE_SEGMENT.is_match(last)
}

/// Keys that look sensitive but are not covered by the registry.
///
/// Keys whose value is already a `${...}` reference are ignored.
pub fn suspicious_keys<S: PropertyStore + ?Sized>(
    store: &S,
    registry: &SensitiveKeyRegistry,
) -> Vec<String> {
    let mut found: Vec<String> = store
        .keys_iter()
        .filter(|key| looks_sensitive(key) && !registry.contains(key))
        .filter(|key| {
            store
                .get_value(key)
                .map(|v| !(v.starts_with("${") && v.ends_with('}')))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();
    found.sort();
    found
}
