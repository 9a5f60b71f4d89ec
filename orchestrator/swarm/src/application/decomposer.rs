// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Decomposer
//!
//! Two-phase propose/reconcile protocol:
//!
//! 1. **Propose**: every candidate is asked, concurrently and under a
//!    deadline, for a [`Proposal`]. Silence or a missed deadline is an
//!    abstention.
//! 2. **Reconcile**: proposals are grouped by [`PartitionSignature`]. A group
//!    holding more than half of the proposals wins; otherwise the proposal of
//!    the highest-reputation proposer is taken (ties to the lower agent id).
//!    Within the winning group the highest-reputation proposer's descriptors
//!    are used.
//!
//! The chosen split must cover every work unit of the task exactly once. If
//! it does not, or nobody proposes, the task runs undecomposed. Decomposition
//! never fails.

use chrono::Utc;
use futures::future::join_all;
use hive_core::agent::AgentId;
use hive_core::config::DecompositionConfig;
use hive_core::events::CoordinationEvent;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::task::{SubTask, Task};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::directory::CapabilityDirectory;
use crate::domain::participant::SwarmParticipant;
use crate::domain::proposal::{validate_partition, PartitionSignature, Proposal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionOutcome {
    /// Complexity below the threshold; nobody was asked.
    Trivial,
    /// A majority of proposers agreed on the partition.
    Consensus,
    /// No majority; the most reputable proposer decided.
    HighestReputation,
    /// No usable proposal; the task runs as its own only sub-task.
    Fallback,
}

impl DecompositionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DecompositionOutcome::Trivial => "trivial",
            DecompositionOutcome::Consensus => "consensus",
            DecompositionOutcome::HighestReputation => "highest_reputation",
            DecompositionOutcome::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DecompositionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub sub_tasks: Vec<SubTask>,
    pub outcome: DecompositionOutcome,
    /// Why a proposal was discarded, for `Fallback`.
    pub rejection: Option<String>,
}

struct Vote {
    agent_id: AgentId,
    reputation: f64,
    proposal: Proposal,
}

/// Higher reputation first, then lower agent id.
fn outranks(a: &Vote, b: &Vote) -> bool {
    a.reputation > b.reputation || (a.reputation == b.reputation && a.agent_id < b.agent_id)
}

pub struct TaskDecomposer {
    config: DecompositionConfig,
    directory: Arc<CapabilityDirectory>,
    event_bus: EventBus,
}

impl TaskDecomposer {
    pub fn new(config: DecompositionConfig, directory: Arc<CapabilityDirectory>, event_bus: EventBus) -> Self {
        Self {
            config,
            directory,
            event_bus,
        }
    }

    pub async fn decompose(&self, task: &Task, proposers: &[Arc<dyn SwarmParticipant>]) -> Decomposition {
        let decomposition = if task.complexity < self.config.complexity_threshold {
            debug!(task_id = %task.id, complexity = task.complexity, "Task below decomposition threshold");
            Decomposition {
                sub_tasks: vec![SubTask::from_task(task)],
                outcome: DecompositionOutcome::Trivial,
                rejection: None,
            }
        } else {
            let votes = self.gather(task, proposers).await;
            self.reconcile(task, votes)
        };

        info!(
            task_id = %task.id,
            outcome = %decomposition.outcome,
            sub_tasks = decomposition.sub_tasks.len(),
            "Task decomposed"
        );
        self.event_bus
            .publish_coordination_event(CoordinationEvent::TaskDecomposed {
                task_id: task.id,
                sub_task_count: decomposition.sub_tasks.len(),
                outcome: decomposition.outcome.to_string(),
                decomposed_at: Utc::now(),
            });

        decomposition
    }

    async fn gather(&self, task: &Task, proposers: &[Arc<dyn SwarmParticipant>]) -> Vec<Vote> {
        let requests = proposers.iter().map(|participant| async move {
            let agent_id = participant.agent_id();
            match timeout(self.config.proposal_timeout, participant.propose(task)).await {
                Ok(Some(proposal)) => Some(Vote {
                    agent_id,
                    reputation: self.directory.reputation(agent_id),
                    proposal,
                }),
                Ok(None) => None,
                Err(_) => {
                    debug!(agent_id = %agent_id, task_id = %task.id, "Proposal deadline expired");
                    None
                }
            }
        });
        join_all(requests).await.into_iter().flatten().collect()
    }

    fn reconcile(&self, task: &Task, votes: Vec<Vote>) -> Decomposition {
        let total = votes.len();
        if total == 0 {
            return fallback(task, "no proposals received");
        }

        let mut groups: BTreeMap<PartitionSignature, Vec<Vote>> = BTreeMap::new();
        for vote in votes {
            groups.entry(vote.proposal.signature()).or_default().push(vote);
        }

        let majority = groups
            .iter()
            .find(|(_, group)| group.len() * 2 > total)
            .map(|(signature, _)| signature.clone());
        let (group, outcome) = match majority.and_then(|signature| groups.remove(&signature)) {
            Some(group) => (group, DecompositionOutcome::Consensus),
            None => (
                groups.into_values().flatten().collect(),
                DecompositionOutcome::HighestReputation,
            ),
        };

        let Some(winner) = group.into_iter().reduce(|best, v| if outranks(&v, &best) { v } else { best }) else {
            return fallback(task, "no proposals received");
        };
        debug!(
            task_id = %task.id,
            proposer = %winner.agent_id,
            outcome = %outcome,
            votes = total,
            "Proposals reconciled"
        );

        match winner.proposal {
            Proposal::Atomic => Decomposition {
                sub_tasks: vec![SubTask::from_task(task)],
                outcome,
                rejection: None,
            },
            Proposal::Split { sub_tasks } => {
                if let Err(e) = validate_partition(&task.payload.units, &sub_tasks) {
                    warn!(task_id = %task.id, proposer = %winner.agent_id, "Discarding decomposition: {}", e);
                    return fallback(task, &e.to_string());
                }
                let sub_tasks = sub_tasks
                    .into_iter()
                    .map(|descriptor| {
                        let mut sub_task = descriptor.into_sub_task(task.id);
                        inherit_from_parent(&mut sub_task, task);
                        sub_task
                    })
                    .collect();
                Decomposition {
                    sub_tasks,
                    outcome,
                    rejection: None,
                }
            }
        }
    }
}

/// Descriptors that leave requirements or input empty take the parent's.
fn inherit_from_parent(sub_task: &mut SubTask, task: &Task) {
    if sub_task.payload.requirements.is_empty() {
        sub_task.payload.requirements = task.payload.requirements.clone();
    }
    if sub_task.payload.input.is_null() {
        sub_task.payload.input = task.payload.input.clone();
    }
}

fn fallback(task: &Task, reason: &str) -> Decomposition {
    Decomposition {
        sub_tasks: vec![SubTask::from_task(task)],
        outcome: DecompositionOutcome::Fallback,
        rejection: Some(reason.to_string()),
    }
}
