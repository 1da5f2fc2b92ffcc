// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::NAMESPACE_PREFIX;
use crate::errors::ConfigError;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static GENERATED: AtomicU64 = AtomicU64::new(0);

/// Process-wide identifier of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(Arc<str>);

impl NamespaceId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, ConfigError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(Self(Arc::from(id)))
    }

    /// A fresh `wasm_<base36>` identifier.
    pub fn generate() -> Self {
        let sequence = GENERATED.fetch_add(1, Ordering::Relaxed);
        let noise = RandomState::new().hash_one(sequence);
        Self(Arc::from(format!("{NAMESPACE_PREFIX}{}", base36(noise))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NamespaceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::with_capacity(13);
    loop {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_prefixed_base36() {
        let id = NamespaceId::generate();
        let suffix = id.as_str().strip_prefix("wasm_").unwrap();
        assert!(!suffix.is_empty());
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1_000).map(|_| NamespaceId::generate()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_blank_id_rejected() {
        assert!(matches!(NamespaceId::new("  "), Err(ConfigError::EmptyNamespace)));
        assert_eq!(NamespaceId::new(" app ").unwrap().as_str(), "app");
    }

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }
}
