// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure domain types for multi-agent coordination. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`participant`] | `SwarmParticipant`, `LivenessSignal` |
//! | [`proposal`] | `Proposal`, `SubTaskDescriptor`, `PartitionSignature` |
//! | [`swarm`] | `Swarm`, `SwarmId` |

pub mod participant;
pub mod proposal;
pub mod swarm;

pub use participant::*;
pub use proposal::*;
pub use swarm::*;
