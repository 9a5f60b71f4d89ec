// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Aggregate
//!
//! The group of agents currently holding work for one task.
//!
//! - [`Swarm`]: aggregate root tracking which agent holds which sub-tasks.
//! - [`SwarmId`]: unique identifier (UUID newtype).
//!
//! Allocation is decided per sub-task, so nothing stops one agent from
//! winning several sub-tasks of the same task. The swarm records that load so
//! the coordinator can report it.

use chrono::{DateTime, Utc};
use hive_core::agent::AgentId;
use hive_core::task::{SubTaskId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Unique identifier for a [`Swarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    /// Generate a new random `SwarmId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SwarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate root for the agents working on one task.
///
/// # Invariants
///
/// - A sub-task is held by at most one agent at a time.
/// - An agent with no sub-tasks left is no longer a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    pub id: SwarmId,
    pub task_id: TaskId,
    assignments: BTreeMap<AgentId, BTreeSet<SubTaskId>>,
    pub created_at: DateTime<Utc>,
}

impl Swarm {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            id: SwarmId::new(),
            task_id,
            assignments: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Give `sub_task_id` to `agent_id`, taking it from any previous holder.
    /// Returns how many sub-tasks the agent now holds.
    pub fn assign(&mut self, agent_id: AgentId, sub_task_id: SubTaskId) -> usize {
        self.release(sub_task_id);
        let held = self.assignments.entry(agent_id).or_default();
        held.insert(sub_task_id);
        held.len()
    }

    /// Drop `sub_task_id` from whichever agent holds it.
    pub fn release(&mut self, sub_task_id: SubTaskId) -> Option<AgentId> {
        let holder = self
            .assignments
            .iter()
            .find(|(_, held)| held.contains(&sub_task_id))
            .map(|(agent, _)| *agent)?;

        if let Some(held) = self.assignments.get_mut(&holder) {
            held.remove(&sub_task_id);
            if held.is_empty() {
                self.assignments.remove(&holder);
            }
        }
        Some(holder)
    }

    pub fn holder(&self, sub_task_id: SubTaskId) -> Option<AgentId> {
        self.assignments
            .iter()
            .find(|(_, held)| held.contains(&sub_task_id))
            .map(|(agent, _)| *agent)
    }

    pub fn load(&self, agent_id: AgentId) -> usize {
        self.assignments.get(&agent_id).map_or(0, BTreeSet::len)
    }

    pub fn members(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.assignments.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_moves_sub_task_between_agents() {
        let mut swarm = Swarm::new(TaskId::new());
        let a = AgentId::new();
        let b = AgentId::new();
        let sub = SubTaskId::new();

        assert_eq!(swarm.assign(a, sub), 1);
        assert_eq!(swarm.holder(sub), Some(a));

        swarm.assign(b, sub);
        assert_eq!(swarm.holder(sub), Some(b));
        assert_eq!(swarm.load(a), 0);
        assert_eq!(swarm.members().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_over_commitment_is_counted() {
        let mut swarm = Swarm::new(TaskId::new());
        let a = AgentId::new();

        swarm.assign(a, SubTaskId::new());
        assert_eq!(swarm.assign(a, SubTaskId::new()), 2);
    }

    #[test]
    fn test_release_dissolves_empty_membership() {
        let mut swarm = Swarm::new(TaskId::new());
        let a = AgentId::new();
        let sub = SubTaskId::new();
        swarm.assign(a, sub);

        assert_eq!(swarm.release(sub), Some(a));
        assert!(swarm.is_empty());
        assert_eq!(swarm.release(sub), None);
    }
}
