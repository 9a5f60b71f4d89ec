// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task & SubTask
//!
//! A [`Task`] enters the swarm pipeline, is split into [`SubTask`]s, and ends in
//! a [`TaskReport`] once every sub-task is terminal.
//!
//! A payload is a description plus an explicit set of [`WorkUnit`]s. Work
//! units are what decomposition partitions: sub-task payloads must cover all
//! of the parent's units and no unit may be claimed twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::market::Allocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubTaskId(pub Uuid);

impl SubTaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubTaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// The single sub-task of an undecomposed task shares the task's identity.
impl From<TaskId> for SubTaskId {
    fn from(id: TaskId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for SubTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkUnit(pub String);

impl WorkUnit {
    pub fn new(unit: impl Into<String>) -> Self {
        Self(unit.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    pub capability: String,
    /// Relative weight of this capability in the match score.
    pub importance: f64,
}

impl CapabilityRequirement {
    pub fn new(capability: impl Into<String>, importance: f64) -> Self {
        Self {
            capability: capability.into(),
            importance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub description: String,
    #[serde(default)]
    pub units: BTreeSet<WorkUnit>,
    #[serde(default)]
    pub requirements: Vec<CapabilityRequirement>,
    #[serde(default)]
    pub input: serde_json::Value,
}

impl TaskPayload {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            units: BTreeSet::new(),
            requirements: Vec::new(),
            input: serde_json::Value::Null,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.units.insert(WorkUnit::new(unit));
        self
    }

    pub fn with_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units.extend(units.into_iter().map(WorkUnit::new));
        self
    }

    pub fn with_requirement(mut self, capability: impl Into<String>, importance: f64) -> Self {
        self.requirements
            .push(CapabilityRequirement::new(capability, importance));
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Decomposed,
    Allocated,
    Executing,
    Completed,
    Failed,
    Reassigned,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "Pending",
            TaskState::Decomposed => "Decomposed",
            TaskState::Allocated => "Allocated",
            TaskState::Executing => "Executing",
            TaskState::Completed => "Completed",
            TaskState::Failed => "Failed",
            TaskState::Reassigned => "Reassigned",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub payload: TaskPayload,
    /// Complexity score, clamped to `[0, 1]`.
    pub complexity: f64,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(payload: TaskPayload, complexity: f64) -> Self {
        let complexity = if complexity.is_nan() {
            0.0
        } else {
            complexity.clamp(0.0, 1.0)
        };
        Self {
            id: TaskId::new(),
            payload,
            complexity,
            state: TaskState::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: SubTaskId,
    pub parent: TaskId,
    pub payload: TaskPayload,
    pub state: TaskState,
}

impl SubTask {
    pub fn new(parent: TaskId, payload: TaskPayload) -> Self {
        Self {
            id: SubTaskId::new(),
            parent,
            payload,
            state: TaskState::Pending,
        }
    }

    /// Wrap an undecomposed task as its own only sub-task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: SubTaskId::from(task.id),
            parent: task.id,
            payload: task.payload.clone(),
            state: TaskState::Pending,
        }
    }
}

/// Error kinds surfaced in a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoCapableAgent,
    InvalidBid,
    StallDetected,
    ExecutionFailure,
    RetriesExhausted,
    DecompositionInvalid,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NoCapableAgent => "NoCapableAgent",
            FailureKind::InvalidBid => "InvalidBid",
            FailureKind::StallDetected => "StallDetected",
            FailureKind::ExecutionFailure => "ExecutionFailure",
            FailureKind::RetriesExhausted => "RetriesExhausted",
            FailureKind::DecompositionInvalid => "DecompositionInvalid",
        };
        f.write_str(s)
    }
}

/// Structured reason attached to a failed sub-task or task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub sub_task_id: SubTaskId,
    pub kind: FailureKind,
    /// Underlying kind of the last attempt when `kind` is `RetriesExhausted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<FailureKind>,
    pub reassignments: u32,
    pub detail: String,
}

impl FailureReason {
    pub fn new(sub_task_id: SubTaskId, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            sub_task_id,
            kind,
            last_error: None,
            reassignments: 0,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sub-task {} failed with {} after {} reassignment(s): {}",
            self.sub_task_id, self.kind, self.reassignments, self.detail
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskReport {
    pub sub_task_id: SubTaskId,
    pub state: TaskState,
    /// Every allocation made for this sub-task, oldest first. All but the
    /// last are marked superseded.
    pub allocations: Vec<Allocation>,
    pub reassignments: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl SubTaskReport {
    pub fn assigned_agent(&self) -> Option<AgentId> {
        self.allocations
            .iter()
            .rev()
            .find(|a| !a.superseded)
            .map(|a| a.agent_id)
    }
}

/// Result handed back to the caller once a task is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: TaskId,
    pub state: TaskState,
    pub sub_tasks: Vec<SubTaskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_complexity_is_clamped() {
        assert_eq!(Task::new(TaskPayload::new("a"), 1.7).complexity, 1.0);
        assert_eq!(Task::new(TaskPayload::new("b"), -0.2).complexity, 0.0);
        assert_eq!(Task::new(TaskPayload::new("c"), f64::NAN).complexity, 0.0);
    }

    #[test]
    fn test_sub_task_from_task_shares_identity_and_payload() {
        let task = Task::new(
            TaskPayload::new("summarise").with_units(["fetch", "summarise"]),
            0.1,
        );
        let sub = SubTask::from_task(&task);

        assert_eq!(sub.id.0, task.id.0);
        assert_eq!(sub.parent, task.id);
        assert_eq!(sub.payload, task.payload);
        assert_eq!(sub.state, TaskState::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Reassigned.is_terminal());
        assert!(!TaskState::Executing.is_terminal());
    }
}
