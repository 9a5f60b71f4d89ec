// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Coordination services: capability directory, decomposition, market
//! allocation, supervised execution, and the runtime facade tying them to
//! memory and lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer

pub mod allocator;
pub mod coordinator;
pub mod decomposer;
pub mod directory;
pub mod participants;
pub mod pipeline;
pub mod runtime;

pub use allocator::{AllocationError, MarketAllocator};
pub use coordinator::ExecutionCoordinator;
pub use decomposer::{Decomposition, DecompositionOutcome, TaskDecomposer};
pub use directory::{match_score, AutonomyGrant, CandidateMatch, CapabilityDirectory, DirectoryError, Profile};
pub use participants::ParticipantPool;
pub use pipeline::SwarmPipeline;
pub use runtime::{HiveRuntime, RuntimeError};
