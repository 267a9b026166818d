//! Host/port override for a single connection URL property.
//!
//! Environment-specific profiles point one URL (usually the datasource) at a
//! different database host. Only the `//host[:port]` fragment changes; the
//! scheme, any `user[:password]@` prefix, path and query string are kept as
//! written.

use crate::{PropertyStore, RedactionError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Group 1 is the optional userinfo, which is carried over unchanged.
static URL_AUTHORITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"//([^/?#@\s]*@)?[^/:?#@\s]+(?::\d+)?").unwrap()
});

/// Rewrites the host and port of one URL-valued property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOverride {
    /// Property holding the URL, e.g. `spring.datasource.url`.
    pub property: String,

    /// Replacement host.
    pub host: String,

    /// Replacement port.
    pub port: u16,
}

/// What happened when an override was applied to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// The URL was rewritten.
    Applied,
    /// The property exists but has no `//host` fragment; left unchanged.
    NoAuthority,
    /// The property is not present.
    Missing,
}

impl HostOverride {
    /// Create a new override.
    pub fn new(property: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            property: property.into(),
            host: host.into(),
            port,
        }
    }

    /// Check the override can produce a well-formed URL.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| RedactionError::InvalidOverride {
            property: self.property.clone(),
            message: message.to_string(),
        };

        if self.property.trim().is_empty() {
            return Err(invalid("property cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(invalid("host cannot be empty"));
        }
        if self
            .host
            .chars()
            .any(|c| matches!(c, '/' | ':' | '?' | '#' | '@') || c.is_whitespace())
        {
            return Err(invalid("host must be a bare host name"));
        }
        if self.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        Ok(())
    }

    /// Rewrite the first `//host[:port]` fragment of `url`.
    ///
    /// Credentials in the authority (`//user:pw@host`) are kept. Returns
    /// `None` when the URL has no such fragment.
    pub fn rewrite(&self, url: &str) -> Option<String> {
        let caps = URL_AUTHORITY.captures(url)?;
        let m = caps.get(0)?;
        let userinfo = caps.get(1).map_or("", |u| u.as_str());
        Some(format!(
            "{}//{}{}:{}{}",
            &url[..m.start()],
            userinfo,
            self.host,
            self.port,
            &url[m.end()..]
        ))
    }

    /// Apply the override to the configured property of a store.
    pub fn apply<S: PropertyStore + ?Sized>(&self, store: &mut S) -> OverrideOutcome {
        let rewritten = match store.get_value(&self.property) {
            None => return OverrideOutcome::Missing,
            Some(url) => self.rewrite(url),
        };

        match rewritten {
            Some(url) => {
                store.replace_value(&self.property, url);
                OverrideOutcome::Applied
            }
            None => OverrideOutcome::NoAuthority,
        }
    }
}
