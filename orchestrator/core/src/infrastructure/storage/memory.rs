// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::storage::{DurableStore, StorageError, StorageKey};

/// Map-backed store for tests and single-process development.
#[derive(Clone, Default)]
pub struct InMemoryDurableStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn put(&self, key: &StorageKey, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries.write().insert(key.render(), value);
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().get(&key.render()).cloned())
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), StorageError> {
        self.entries.write().remove(&key.render());
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
