// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Durable Storage Port
//!
//! Key-value persistence used for agent hibernation snapshots and skill
//! configuration records. Implementations live in
//! `crate::infrastructure::storage`:
//!
//! | Adapter | Backing |
//! |---------|---------|
//! | `InMemoryDurableStore` | process memory (tests, development) |
//! | `LocalDurableStore` | one file per key under a root directory |
//!
//! Keys are typed ([`StorageKey`]) and rendered to a stable path-like string
//! only at the adapter boundary.

use async_trait::async_trait;
use std::fmt;

use crate::domain::agent::AgentId;
use crate::domain::skill::SkillId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AgentSnapshot(AgentId),
    SkillConfig { agent: AgentId, skill: SkillId },
}

impl StorageKey {
    pub fn render(&self) -> String {
        match self {
            StorageKey::AgentSnapshot(agent) => format!("agents/{}/snapshot", agent),
            StorageKey::SkillConfig { agent, skill } => {
                format!("{}{}", Self::skills_prefix(*agent), skill)
            }
        }
    }

    /// Prefix shared by every skill record of one agent.
    pub fn skills_prefix(agent: AgentId) -> String {
        format!("agents/{}/skills/", agent)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Atomic put/get by key. A `put` either fully replaces the value or leaves
/// the previous one in place.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn put(&self, key: &StorageKey, value: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete(&self, key: &StorageKey) -> Result<(), StorageError>;

    /// Rendered keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Key cannot be stored by this backend: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
