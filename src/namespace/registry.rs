// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ConfigError, ProtocolError};
use crate::namespace::{CoordinationRecord, NamespaceId};
use crate::protocol::Role;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Table of live namespaces.
///
/// One registry is shared by every pool that should see the same namespaces;
/// it is passed around explicitly as an `Arc`. Each operation takes the lock
/// once, so operations on different namespaces never observe each other
/// half-done.
#[derive(Default)]
pub struct NamespaceRegistry {
    records: Mutex<HashMap<NamespaceId, Arc<CoordinationRecord>>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `namespace` for `role`.
    ///
    /// # Errors
    /// [`ConfigError::NamespaceExists`] if the namespace already has a record;
    /// the existing record is left untouched.
    pub fn create(
        &self,
        namespace: NamespaceId,
        role: Role,
    ) -> Result<Arc<CoordinationRecord>, ConfigError> {
        let mut records = self.lock();
        if let Some(existing) = records.get(&namespace) {
            return Err(ConfigError::NamespaceExists {
                namespace: namespace.to_string(),
                role: existing.role(),
            });
        }
        let record = Arc::new(CoordinationRecord::new(namespace.clone(), role));
        records.insert(namespace, record.clone());
        Ok(record)
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<CoordinationRecord>> {
        self.lock().get(namespace).cloned()
    }

    /// Remove the record of `namespace` and hand it back to the caller.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownNamespace`] if nothing is registered under it.
    pub fn destroy(&self, namespace: &str) -> Result<Arc<CoordinationRecord>, ProtocolError> {
        self.lock()
            .remove(namespace)
            .ok_or_else(|| ProtocolError::UnknownNamespace(namespace.to_string()))
    }

    /// Remove `record` only while it is still the registered one, so a stale
    /// holder can not destroy a namespace launched again under the same id.
    pub fn destroy_record(
        &self,
        record: &Arc<CoordinationRecord>,
    ) -> Result<Arc<CoordinationRecord>, ProtocolError> {
        let namespace = record.namespace().as_str();
        let mut records = self.lock();
        if records
            .get(namespace)
            .is_some_and(|current| Arc::ptr_eq(current, record))
        {
            if let Some(removed) = records.remove(namespace) {
                return Ok(removed);
            }
        }
        Err(ProtocolError::UnknownNamespace(namespace.to_string()))
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.lock().contains_key(namespace)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NamespaceId, Arc<CoordinationRecord>>> {
        // Critical sections are single map operations; a poisoned map is still consistent.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(name: &str) -> NamespaceId {
        NamespaceId::new(name).unwrap()
    }

    #[test]
    fn test_create_get_destroy() {
        let registry = NamespaceRegistry::new();
        assert!(registry.is_empty());

        let record = registry.create(id("wasm_abc"), Role::Main).unwrap();
        assert_eq!(record.namespace().as_str(), "wasm_abc");
        assert!(registry.contains("wasm_abc"));
        assert!(registry.get("wasm_abc").is_some());

        let removed = registry.destroy("wasm_abc").unwrap();
        assert!(Arc::ptr_eq(&record, &removed));
        assert!(registry.get("wasm_abc").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_destroy_record_ignores_replaced_record() {
        let registry = NamespaceRegistry::new();
        let stale = registry.create(id("wasm_abc"), Role::Main).unwrap();
        registry.destroy("wasm_abc").unwrap();
        let fresh = registry.create(id("wasm_abc"), Role::Main).unwrap();

        assert_eq!(
            registry.destroy_record(&stale).err(),
            Some(ProtocolError::UnknownNamespace("wasm_abc".to_string()))
        );
        assert!(registry.contains("wasm_abc"));

        let removed = registry.destroy_record(&fresh).unwrap();
        assert!(Arc::ptr_eq(&fresh, &removed));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_create_fails_and_keeps_first_record() {
        let registry = NamespaceRegistry::new();
        let first = registry.create(id("wasm_abc"), Role::Main).unwrap();

        let err = registry.create(id("wasm_abc"), Role::ThreadWorker).err().unwrap();
        assert_eq!(err.to_string(), "Already initialized as wasm_abc.wasi_main");

        let current = registry.get("wasm_abc").unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_destroy_unknown_namespace_fails() {
        let registry = NamespaceRegistry::new();
        assert_eq!(
            registry.destroy("wasm_missing").err(),
            Some(ProtocolError::UnknownNamespace("wasm_missing".to_string()))
        );
    }

    #[test]
    fn test_concurrent_creates_of_distinct_namespaces() {
        let registry = Arc::new(NamespaceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry
                        .create(id(&format!("wasm_{i}")), Role::Main)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_concurrent_creates_of_same_namespace_admit_one() {
        let registry = Arc::new(NamespaceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.create(id("wasm_shared"), Role::Main).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }
}
