// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events published on the [`EventBus`](crate::infrastructure::event_bus::EventBus).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, SessionMarker};
use crate::domain::skill::SkillId;
use crate::domain::task::{FailureReason, SubTaskId, TaskId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentLifecycleEvent {
    AgentRegistered {
        agent_id: AgentId,
        name: String,
        registered_at: DateTime<Utc>,
    },
    AgentHibernated {
        agent_id: AgentId,
        session: SessionMarker,
        hibernated_at: DateTime<Utc>,
    },
    AgentWoken {
        agent_id: AgentId,
        session: SessionMarker,
        woken_at: DateTime<Utc>,
    },
    AgentTerminated {
        agent_id: AgentId,
        terminated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemoryEvent {
    EpisodesConsolidated {
        agent_id: AgentId,
        patterns_written: usize,
        episodes_trimmed: usize,
        consolidated_at: DateTime<Utc>,
    },
    SkillBound {
        agent_id: AgentId,
        skill_id: SkillId,
        bound_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinationEvent {
    TaskDecomposed {
        task_id: TaskId,
        sub_task_count: usize,
        /// `trivial`, `consensus`, `highest_reputation` or `fallback`.
        outcome: String,
        decomposed_at: DateTime<Utc>,
    },
    SubTaskAllocated {
        task_id: TaskId,
        sub_task_id: SubTaskId,
        agent_id: AgentId,
        score: f64,
        round: u32,
        allocated_at: DateTime<Utc>,
    },
    StallDetected {
        task_id: TaskId,
        sub_task_id: SubTaskId,
        agent_id: AgentId,
        detected_at: DateTime<Utc>,
    },
    SubTaskReassigned {
        task_id: TaskId,
        sub_task_id: SubTaskId,
        from_agent: AgentId,
        reassignments: u32,
        reassigned_at: DateTime<Utc>,
    },
    SubTaskCompleted {
        task_id: TaskId,
        sub_task_id: SubTaskId,
        agent_id: AgentId,
        completed_at: DateTime<Utc>,
    },
    SubTaskFailed {
        task_id: TaskId,
        sub_task_id: SubTaskId,
        reason: FailureReason,
        failed_at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        completed_at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: TaskId,
        reason: FailureReason,
        failed_at: DateTime<Utc>,
    },
}

impl CoordinationEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            CoordinationEvent::TaskDecomposed { task_id, .. }
            | CoordinationEvent::SubTaskAllocated { task_id, .. }
            | CoordinationEvent::StallDetected { task_id, .. }
            | CoordinationEvent::SubTaskReassigned { task_id, .. }
            | CoordinationEvent::SubTaskCompleted { task_id, .. }
            | CoordinationEvent::SubTaskFailed { task_id, .. }
            | CoordinationEvent::TaskCompleted { task_id, .. }
            | CoordinationEvent::TaskFailed { task_id, .. } => *task_id,
        }
    }
}
