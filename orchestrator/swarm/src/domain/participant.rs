// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Participant Port
//!
//! How the coordination engine talks to a candidate agent. Every call may be
//! slow; the engine wraps each one in its own deadline and treats expiry as
//! an empty answer (no bid, no proposal, missed heartbeat).

use async_trait::async_trait;
use hive_core::agent::AgentId;
use hive_core::market::Bid;
use hive_core::task::{SubTask, SubTaskId, Task};

use crate::domain::proposal::Proposal;

/// Answer to one liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    Alive,
    /// The agent answered but reported no progress.
    Missed,
    /// The agent reports it cannot make progress. Reassigns immediately.
    Stalled,
}

#[async_trait]
pub trait SwarmParticipant: Send + Sync {
    fn agent_id(&self) -> AgentId;

    /// `None` declines the sub-task.
    async fn solicit_bid(&self, sub_task: &SubTask) -> Option<Bid>;

    /// `None` abstains from the decomposition vote.
    async fn propose(&self, task: &Task) -> Option<Proposal>;

    async fn heartbeat(&self, sub_task_id: SubTaskId) -> LivenessSignal;
}
