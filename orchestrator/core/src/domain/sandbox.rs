// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Sandboxed Execution Port
//!
//! The execution coordinator hands each allocated sub-task to a
//! [`SandboxExecutor`] together with the task-wide [`SharedContext`]. Isolation
//! mechanics are the executor's business; the coordinator only needs an async
//! call that honours its [`CancellationToken`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::agent::AgentId;
use crate::domain::task::{SubTask, TaskId, TaskPayload};

/// Context visible to every agent working on sub-tasks of the same task.
///
/// Built once before execution starts and shared behind an `Arc`; there is no
/// way to mutate it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    task_id: TaskId,
    description: String,
    input: serde_json::Value,
    entries: BTreeMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl SharedContext {
    pub fn builder(task_id: TaskId, payload: &TaskPayload) -> SharedContextBuilder {
        SharedContextBuilder {
            task_id,
            description: payload.description.clone(),
            input: payload.input.clone(),
            entries: BTreeMap::new(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input(&self) -> &serde_json::Value {
        &self.input
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.entries
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub struct SharedContextBuilder {
    task_id: TaskId,
    description: String,
    input: serde_json::Value,
    entries: BTreeMap<String, serde_json::Value>,
}

impl SharedContextBuilder {
    pub fn entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Arc<SharedContext> {
        Arc::new(SharedContext {
            task_id: self.task_id,
            description: self.description,
            input: self.input,
            entries: self.entries,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub sub_task: SubTask,
    pub agent_id: AgentId,
    /// Zero for the first attempt, incremented on every reassignment.
    pub attempt: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub result: serde_json::Value,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Execution cancelled")]
    Cancelled,
}

#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute(
        &self,
        request: ExecutionRequest,
        context: Arc<SharedContext>,
        cancel: CancellationToken,
    ) -> Result<ExecutionOutput, SandboxError>;
}
