//! Content fingerprint used as the deduplication key

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::validators::normalize_text;

/// SHA-256 hex digest of the normalized action-item text.
///
/// Depends on nothing but the text: the same sanitized text always yields the
/// same fingerprint, whatever the meeting or submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `text` after normalization
    pub fn of(text: &str) -> Self {
        let normalized = normalize_text(text);
        let digest = Sha256::digest(normalized.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Wrap an existing hex digest (e.g. a key read from the state document)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
