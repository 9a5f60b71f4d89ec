// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Pipeline
//!
//! decompose → allocate → execute for one task, with every registered,
//! Active participant as a candidate.

use hive_core::agent::LifecycleState;
use hive_core::task::{SubTask, Task, TaskReport, TaskState};
use hive_cortex::application::LifecycleManager;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::allocator::MarketAllocator;
use crate::application::coordinator::ExecutionCoordinator;
use crate::application::decomposer::TaskDecomposer;
use crate::application::participants::ParticipantPool;
use crate::domain::participant::SwarmParticipant;

pub struct SwarmPipeline {
    decomposer: TaskDecomposer,
    allocator: Arc<MarketAllocator>,
    coordinator: ExecutionCoordinator,
    participants: Arc<ParticipantPool>,
    lifecycle: Arc<LifecycleManager>,
}

impl SwarmPipeline {
    pub fn new(
        decomposer: TaskDecomposer,
        allocator: Arc<MarketAllocator>,
        coordinator: ExecutionCoordinator,
        participants: Arc<ParticipantPool>,
        lifecycle: Arc<LifecycleManager>,
    ) -> Self {
        Self {
            decomposer,
            allocator,
            coordinator,
            participants,
            lifecycle,
        }
    }

    /// Participants whose agent is currently Active. Hibernating agents are
    /// not woken for coordination.
    pub async fn candidates(&self) -> Vec<Arc<dyn SwarmParticipant>> {
        let mut candidates = Vec::new();
        for participant in self.participants.all() {
            let agent_id = participant.agent_id();
            match self.lifecycle.state(agent_id).await {
                Some(LifecycleState::Active) => candidates.push(participant),
                state => debug!(agent_id = %agent_id, ?state, "Participant skipped"),
            }
        }
        candidates
    }

    pub async fn run(&self, mut task: Task) -> TaskReport {
        let candidates = self.candidates().await;
        info!(
            task_id = %task.id,
            complexity = task.complexity,
            candidates = candidates.len(),
            "Coordinating task"
        );

        let decomposition = self.decomposer.decompose(&task, &candidates).await;
        task.state = TaskState::Decomposed;

        let results = self.allocator.allocate(&decomposition.sub_tasks, &candidates).await;
        task.state = TaskState::Allocated;

        let plan: Vec<_> = decomposition
            .sub_tasks
            .into_iter()
            .zip(results)
            .map(|(mut sub_task, result): (SubTask, _)| {
                if result.is_ok() {
                    sub_task.state = TaskState::Allocated;
                }
                (sub_task, result)
            })
            .collect();

        task.state = TaskState::Executing;
        let report = self.coordinator.execute(&task, plan, &candidates).await;
        task.state = report.state;
        debug!(task_id = %task.id, state = %task.state, "Task finished");
        report
    }
}
