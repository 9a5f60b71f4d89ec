// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Services over the memory aggregate: the per-agent store, consolidation,
//! prompt assembly and the hibernation lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer

pub mod consolidation;
pub mod lifecycle;
pub mod memory_store;
pub mod prompt;

pub use consolidation::{ConsolidationReport, ConsolidationService, ConsolidationTrigger};
pub use lifecycle::{LifecycleError, LifecycleManager, ReputationSource, RestoredAgent};
pub use memory_store::MemoryStore;
pub use prompt::{PromptAssembler, PromptError};
