// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Durable store adapters and the factory that picks one from configuration.

pub mod local;
pub mod memory;

pub use local::LocalDurableStore;
pub use memory::InMemoryDurableStore;

use std::sync::Arc;

use crate::domain::config::StorageConfig;
use crate::domain::storage::{DurableStore, StorageError};

/// Build the store selected by `spec.storage`.
pub fn durable_store_from_config(config: &StorageConfig) -> Result<Arc<dyn DurableStore>, StorageError> {
    match config {
        StorageConfig::InMemory => {
            tracing::info!("Using in-memory durable store");
            Ok(Arc::new(InMemoryDurableStore::new()))
        }
        StorageConfig::Local { path } => {
            tracing::info!(path = %path.display(), "Using local filesystem durable store");
            Ok(Arc::new(LocalDurableStore::new(path.clone())?))
        }
    }
}
