// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-swarm`: Multi-Agent Coordination
//!
//! Turns a task into sub-tasks, sells them to capable agents, and supervises
//! their execution until every sub-task is terminal.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SwarmParticipant` port, `Proposal`, `Swarm` aggregate |
//! | [`application`] | Application | `CapabilityDirectory`, `TaskDecomposer`, `MarketAllocator`, `ExecutionCoordinator`, `SwarmPipeline`, `HiveRuntime` |
//!
//! ## Key Concepts
//!
//! - **Reputation**: exponential moving average of an agent's outcomes. Gates
//!   who may bid and how much autonomy an agent is granted.
//! - **Bid**: `(cost, confidence)` offer; the winner maximizes
//!   `confidence × reputation / cost`.
//! - **Stall**: consecutive missed liveness checks. The sub-task is cancelled
//!   and re-auctioned without the stalled agent, at most twice by default.
//!
//! Allocation is per sub-task. One agent may end up holding several
//! sub-tasks of the same task; the coordinator logs it and carries on.

pub mod application;
pub mod domain;

pub use domain::*;
