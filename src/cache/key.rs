//! Cache key generation using truncated SHA-256 hashes

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Error, Result};

/// Prefix shared by every key this tool writes to the transient store
pub const KEY_NAMESPACE: &str = "sitediag_";

/// Number of hex characters kept from the identity hash
pub const SUFFIX_LEN: usize = 10;

/// Probe kind for outbound request checks
pub const REQUEST_KIND: &str = "req";

/// The inputs that determine a probe's outcome and therefore its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeIdentity {
    kind: String,
    parts: Vec<String>,
}

impl ProbeIdentity {
    /// Identity for a parameterless probe, e.g. an attachment count.
    pub fn named(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parts: Vec::new(),
        }
    }

    /// Identity for an outbound request check.
    ///
    /// The method is upper-cased so `get` and `GET` share an entry.
    pub fn request(url: impl Into<String>, method: impl AsRef<str>) -> Self {
        Self {
            kind: REQUEST_KIND.to_string(),
            parts: vec![
                url.into().trim().to_string(),
                method.as_ref().trim().to_ascii_uppercase(),
            ],
        }
    }

    /// Append an input that changes the probe's outcome
    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Derive the cache key, rejecting identities that cannot be made stable.
    pub fn cache_key(&self) -> Result<CacheKey> {
        self.validate()?;

        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_bytes());
        hasher.update(b"|");

        // Length-prefix each part so ("a|b", "c") and ("a", "b|c") differ
        for part in &self.parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }

        let digest = format!("{:x}", hasher.finalize());
        Ok(CacheKey {
            kind: self.kind.clone(),
            suffix: digest[..SUFFIX_LEN].to_string(),
        })
    }

    fn validate(&self) -> Result<()> {
        if !is_valid_kind(&self.kind) {
            return Err(Error::InvalidIdentity(format!(
                "kind '{}' must be non-empty lowercase snake_case",
                self.kind
            )));
        }

        if self.parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidIdentity(format!(
                "{} identity has an empty field",
                self.kind
            )));
        }

        if self.kind == REQUEST_KIND {
            let [url, method] = self.parts.as_slice() else {
                return Err(Error::InvalidIdentity(
                    "request identity needs a URL and a method".to_string(),
                ));
            };

            let parsed = reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidIdentity(format!("URL '{}': {}", url, e)))?;
            if parsed.host_str().is_none() {
                return Err(Error::InvalidIdentity(format!("URL '{}' has no host", url)));
            }

            if !method.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(Error::InvalidIdentity(format!(
                    "HTTP method '{}' is not a token",
                    method
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for ProbeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.parts.join(" "))
        }
    }
}

/// A namespaced, truncated-hash key into the transient store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    kind: String,
    suffix: String,
}

impl CacheKey {
    /// Rebuild a key from the suffix an operator passes to a clear action.
    pub fn from_suffix(kind: &str, suffix: &str) -> Result<Self> {
        if !is_valid_kind(kind) {
            return Err(Error::InvalidIdentity(format!("unknown cache kind '{}'", kind)));
        }

        let suffix = suffix.trim().to_ascii_lowercase();
        if suffix.len() != SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidIdentity(format!(
                "cache suffix must be {} hex characters",
                SUFFIX_LEN
            )));
        }

        Ok(Self {
            kind: kind.to_string(),
            suffix,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The hash part, as carried by the `cache` parameter of clear actions
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Full store key: `sitediag_<kind>_<suffix>`
    pub fn as_store_key(&self) -> String {
        format!("{}{}_{}", KEY_NAMESPACE, self.kind, self.suffix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_store_key())
    }
}

fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
