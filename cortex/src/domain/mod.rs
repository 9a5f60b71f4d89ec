// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Memory tiers, pattern extraction and snapshot encoding. No I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Per-agent memory aggregate and its durable form

pub mod memory;
pub mod pattern;
pub mod snapshot;

pub use memory::*;
pub use pattern::*;
pub use snapshot::*;

use hive_core::agent::AgentId;
use hive_core::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("No memory loaded for agent {0}")]
    UnknownAgent(AgentId),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
