// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Execution Coordinator
//!
//! Runs every allocated sub-task of one task to a terminal state.
//!
//! Each sub-task gets its own supervisor future inside a [`JoinSet`]. A
//! supervisor races the sandboxed execution against a liveness monitor that
//! polls the assigned agent every `liveness_interval`. When the monitor sees
//! `missed_checks` consecutive missed checks (or an explicit `Stalled`), the
//! execution future is dropped and its [`CancellationToken`] fired before the
//! sub-task moves on, so a stalled agent can never complete a sub-task that
//! has already been handed to someone else.
//!
//! Stalls and execution failures both cost the agent reputation, put it in
//! cooldown, exclude it from further rounds for this sub-task, and trigger a
//! fresh bidding round. After `max_reassignments` reassignments the next
//! failure is terminal (`RetriesExhausted`).
//!
//! Supervisors report agent assignments to the coordinating loop, which owns
//! the [`Swarm`] bookkeeping for the task.

use chrono::Utc;
use hive_core::agent::AgentId;
use hive_core::config::ExecutionConfig;
use hive_core::events::CoordinationEvent;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::market::Allocation;
use hive_core::sandbox::{ExecutionRequest, SandboxExecutor, SharedContext};
use hive_core::task::{
    FailureKind, FailureReason, SubTask, SubTaskId, SubTaskReport, Task, TaskReport, TaskState,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::allocator::{AllocationError, MarketAllocator};
use crate::application::directory::CapabilityDirectory;
use crate::domain::participant::{LivenessSignal, SwarmParticipant};
use crate::domain::swarm::Swarm;

enum Assignment {
    Assigned { sub_task_id: SubTaskId, agent_id: AgentId },
    Released { sub_task_id: SubTaskId },
}

enum AttemptOutcome {
    Completed(serde_json::Value),
    Stalled,
    Failed(String),
}

#[derive(Clone)]
pub struct ExecutionCoordinator {
    config: ExecutionConfig,
    allocator: Arc<MarketAllocator>,
    directory: Arc<CapabilityDirectory>,
    sandbox: Arc<dyn SandboxExecutor>,
    event_bus: EventBus,
}

impl ExecutionCoordinator {
    pub fn new(
        config: ExecutionConfig,
        allocator: Arc<MarketAllocator>,
        directory: Arc<CapabilityDirectory>,
        sandbox: Arc<dyn SandboxExecutor>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            allocator,
            directory,
            sandbox,
            event_bus,
        }
    }

    /// Drive `sub_tasks` (paired with their first-round allocation results)
    /// to completion and build the task report.
    ///
    /// A sub-task whose first round produced no allocation fails immediately
    /// without entering `Executing`.
    pub async fn execute(
        &self,
        task: &Task,
        plan: Vec<(SubTask, Result<Allocation, AllocationError>)>,
        participants: &[Arc<dyn SwarmParticipant>],
    ) -> TaskReport {
        let context = SharedContext::builder(task.id, &task.payload)
            .entry("sub_task_count", serde_json::json!(plan.len()))
            .entry("complexity", serde_json::json!(task.complexity))
            .build();
        let participants: Arc<Vec<Arc<dyn SwarmParticipant>>> = Arc::new(participants.to_vec());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub_task_ids: Vec<SubTaskId> = plan.iter().map(|(s, _)| s.id).collect();
        let mut spawned = HashMap::new();
        let mut supervisors = JoinSet::new();

        for (index, (sub_task, initial)) in plan.into_iter().enumerate() {
            let coordinator = self.clone();
            let context = Arc::clone(&context);
            let participants = Arc::clone(&participants);
            let tx = tx.clone();
            let handle = supervisors.spawn(async move {
                let report = coordinator
                    .supervise(sub_task, initial, context, participants, tx)
                    .await;
                (index, report)
            });
            spawned.insert(handle.id(), index);
        }
        drop(tx);

        let mut swarm = Swarm::new(task.id);
        let mut reports: Vec<Option<SubTaskReport>> = vec![None; sub_task_ids.len()];

        loop {
            tokio::select! {
                biased;
                Some(assignment) = rx.recv() => track(&mut swarm, assignment),
                joined = supervisors.join_next() => match joined {
                    Some(Ok((index, report))) => reports[index] = Some(report),
                    Some(Err(e)) => {
                        error!(task_id = %task.id, "Sub-task supervisor aborted: {}", e);
                        if let Some(&index) = spawned.get(&e.id()) {
                            let reason = FailureReason::new(
                                sub_task_ids[index],
                                FailureKind::ExecutionFailure,
                                format!("supervisor aborted: {}", e),
                            );
                            reports[index] = Some(SubTaskReport {
                                sub_task_id: sub_task_ids[index],
                                state: TaskState::Failed,
                                allocations: Vec::new(),
                                reassignments: 0,
                                output: None,
                                failure: Some(reason),
                            });
                        }
                    }
                    None => break,
                },
            }
        }
        while let Ok(assignment) = rx.try_recv() {
            track(&mut swarm, assignment);
        }
        if !swarm.is_empty() {
            warn!(task_id = %task.id, "Swarm still holds assignments after execution");
        }

        let sub_tasks: Vec<SubTaskReport> = reports
            .into_iter()
            .zip(sub_task_ids)
            .map(|(report, sub_task_id)| {
                report.unwrap_or_else(|| SubTaskReport {
                    sub_task_id,
                    state: TaskState::Failed,
                    allocations: Vec::new(),
                    reassignments: 0,
                    output: None,
                    failure: Some(FailureReason::new(
                        sub_task_id,
                        FailureKind::ExecutionFailure,
                        "supervisor produced no report",
                    )),
                })
            })
            .collect();

        self.finish(task, sub_tasks)
    }

    fn finish(&self, task: &Task, sub_tasks: Vec<SubTaskReport>) -> TaskReport {
        let failure = sub_tasks.iter().find_map(|r| r.failure.clone());
        let state = if sub_tasks.iter().all(|r| r.state == TaskState::Completed) {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        let finished_at = Utc::now();

        match &failure {
            Some(reason) if state == TaskState::Failed => {
                warn!(task_id = %task.id, kind = %reason.kind, "Task failed");
                self.event_bus
                    .publish_coordination_event(CoordinationEvent::TaskFailed {
                        task_id: task.id,
                        reason: reason.clone(),
                        failed_at: finished_at,
                    });
            }
            _ => {
                info!(task_id = %task.id, sub_tasks = sub_tasks.len(), "Task completed");
                self.event_bus
                    .publish_coordination_event(CoordinationEvent::TaskCompleted {
                        task_id: task.id,
                        completed_at: finished_at,
                    });
            }
        }

        TaskReport {
            task_id: task.id,
            state,
            sub_tasks,
            failure,
            finished_at,
        }
    }

    async fn supervise(
        self,
        mut sub_task: SubTask,
        initial: Result<Allocation, AllocationError>,
        context: Arc<SharedContext>,
        participants: Arc<Vec<Arc<dyn SwarmParticipant>>>,
        tx: mpsc::UnboundedSender<Assignment>,
    ) -> SubTaskReport {
        let mut allocations: Vec<Allocation> = Vec::new();
        let mut excluded: BTreeSet<AgentId> = BTreeSet::new();
        let mut reassignments = 0;

        let mut allocation = match initial {
            Ok(allocation) => allocation,
            Err(e) => {
                let reason = FailureReason::new(sub_task.id, e.kind(), e.to_string());
                return self.fail(&sub_task, allocations, reason);
            }
        };

        loop {
            let agent_id = allocation.agent_id;
            allocations.push(allocation);
            sub_task.state = TaskState::Executing;
            // The loop only stops listening once every supervisor is done.
            let _ = tx.send(Assignment::Assigned {
                sub_task_id: sub_task.id,
                agent_id,
            });

            let outcome = self
                .run_attempt(&sub_task, agent_id, reassignments, &context, &participants)
                .await;
            let _ = tx.send(Assignment::Released {
                sub_task_id: sub_task.id,
            });

            let (kind, detail) = match outcome {
                AttemptOutcome::Completed(output) => {
                    return self.complete(sub_task, agent_id, allocations, reassignments, output);
                }
                AttemptOutcome::Stalled => {
                    warn!(sub_task_id = %sub_task.id, agent_id = %agent_id, "Stall detected");
                    self.event_bus
                        .publish_coordination_event(CoordinationEvent::StallDetected {
                            task_id: sub_task.parent,
                            sub_task_id: sub_task.id,
                            agent_id,
                            detected_at: Utc::now(),
                        });
                    (
                        FailureKind::StallDetected,
                        format!("agent {} stopped making progress", agent_id),
                    )
                }
                AttemptOutcome::Failed(message) => {
                    warn!(sub_task_id = %sub_task.id, agent_id = %agent_id, "Execution failed: {}", message);
                    (FailureKind::ExecutionFailure, message)
                }
            };

            if let Err(e) = self.directory.update_reputation(agent_id, false) {
                warn!(agent_id = %agent_id, "Could not record failure: {}", e);
            }
            self.allocator.cool_down(agent_id, self.config.cooldown);
            excluded.insert(agent_id);

            if reassignments >= self.config.max_reassignments {
                let mut reason = FailureReason::new(sub_task.id, FailureKind::RetriesExhausted, detail);
                reason.last_error = Some(kind);
                reason.reassignments = reassignments;
                return self.fail(&sub_task, allocations, reason);
            }

            reassignments += 1;
            sub_task.state = TaskState::Reassigned;
            metrics::counter!("hive_subtasks_reassigned_total", "cause" => kind.to_string()).increment(1);
            info!(
                sub_task_id = %sub_task.id,
                from_agent = %agent_id,
                reassignments,
                "Reassigning sub-task"
            );
            self.event_bus
                .publish_coordination_event(CoordinationEvent::SubTaskReassigned {
                    task_id: sub_task.parent,
                    sub_task_id: sub_task.id,
                    from_agent: agent_id,
                    reassignments,
                    reassigned_at: Utc::now(),
                });

            match self
                .allocator
                .allocate_one(&sub_task, &participants, &excluded, reassignments)
                .await
            {
                Ok(next) => {
                    if let Some(previous) = allocations.last_mut() {
                        previous.supersede();
                    }
                    allocation = next;
                }
                Err(e) => {
                    let mut reason = FailureReason::new(sub_task.id, e.kind(), e.to_string());
                    reason.reassignments = reassignments;
                    return self.fail(&sub_task, allocations, reason);
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        sub_task: &SubTask,
        agent_id: AgentId,
        attempt: u32,
        context: &Arc<SharedContext>,
        participants: &[Arc<dyn SwarmParticipant>],
    ) -> AttemptOutcome {
        let participant = participants.iter().find(|p| p.agent_id() == agent_id).cloned();
        let cancel = CancellationToken::new();
        let request = ExecutionRequest {
            sub_task: sub_task.clone(),
            agent_id,
            attempt,
        };

        debug!(sub_task_id = %sub_task.id, agent_id = %agent_id, attempt, "Starting execution");
        let outcome = tokio::select! {
            result = self.sandbox.execute(request, Arc::clone(context), cancel.clone()) => match result {
                Ok(output) => AttemptOutcome::Completed(output.result),
                Err(e) => AttemptOutcome::Failed(e.to_string()),
            },
            () = self.monitor_liveness(participant, sub_task.id) => AttemptOutcome::Stalled,
        };
        if matches!(outcome, AttemptOutcome::Stalled) {
            cancel.cancel();
        }
        outcome
    }

    /// Resolves once the agent counts as stalled. Never resolves for a
    /// healthy agent.
    async fn monitor_liveness(&self, participant: Option<Arc<dyn SwarmParticipant>>, sub_task_id: SubTaskId) {
        let period = self.config.liveness_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut missed = 0;

        loop {
            ticker.tick().await;
            let signal = match &participant {
                Some(p) => timeout(self.config.liveness_timeout, p.heartbeat(sub_task_id))
                    .await
                    .unwrap_or(LivenessSignal::Missed),
                None => LivenessSignal::Missed,
            };
            match signal {
                LivenessSignal::Alive => missed = 0,
                LivenessSignal::Missed => {
                    missed += 1;
                    debug!(sub_task_id = %sub_task_id, missed, "Missed liveness check");
                    if missed >= self.config.missed_checks {
                        return;
                    }
                }
                LivenessSignal::Stalled => return,
            }
        }
    }

    fn complete(
        &self,
        mut sub_task: SubTask,
        agent_id: AgentId,
        allocations: Vec<Allocation>,
        reassignments: u32,
        output: serde_json::Value,
    ) -> SubTaskReport {
        sub_task.state = TaskState::Completed;
        if let Err(e) = self.directory.update_reputation(agent_id, true) {
            warn!(agent_id = %agent_id, "Could not record success: {}", e);
        }
        info!(sub_task_id = %sub_task.id, agent_id = %agent_id, reassignments, "Sub-task completed");
        self.event_bus
            .publish_coordination_event(CoordinationEvent::SubTaskCompleted {
                task_id: sub_task.parent,
                sub_task_id: sub_task.id,
                agent_id,
                completed_at: Utc::now(),
            });

        SubTaskReport {
            sub_task_id: sub_task.id,
            state: sub_task.state,
            allocations,
            reassignments,
            output: Some(output),
            failure: None,
        }
    }

    fn fail(&self, sub_task: &SubTask, allocations: Vec<Allocation>, reason: FailureReason) -> SubTaskReport {
        metrics::counter!("hive_subtasks_failed_total", "kind" => reason.kind.to_string()).increment(1);
        warn!(sub_task_id = %sub_task.id, "{}", reason);
        self.event_bus
            .publish_coordination_event(CoordinationEvent::SubTaskFailed {
                task_id: sub_task.parent,
                sub_task_id: sub_task.id,
                reason: reason.clone(),
                failed_at: Utc::now(),
            });

        SubTaskReport {
            sub_task_id: sub_task.id,
            state: TaskState::Failed,
            allocations,
            reassignments: reason.reassignments,
            output: None,
            failure: Some(reason),
        }
    }
}

fn track(swarm: &mut Swarm, assignment: Assignment) {
    match assignment {
        Assignment::Assigned { sub_task_id, agent_id } => {
            let load = swarm.assign(agent_id, sub_task_id);
            if load > 1 {
                warn!(
                    swarm_id = %swarm.id,
                    agent_id = %agent_id,
                    load,
                    "Agent is executing several sub-tasks of one task at once"
                );
            }
        }
        Assignment::Released { sub_task_id } => {
            swarm.release(sub_task_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proposal::Proposal;
    use async_trait::async_trait;
    use hive_core::agent::CapabilitySet;
    use hive_core::config::{DirectoryConfig, MarketConfig};
    use hive_core::market::Bid;
    use hive_core::sandbox::{ExecutionOutput, SandboxError};
    use hive_core::task::TaskPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Worker {
        id: AgentId,
        cost: f64,
        signal: LivenessSignal,
        heartbeats: AtomicUsize,
    }

    #[async_trait]
    impl SwarmParticipant for Worker {
        fn agent_id(&self) -> AgentId {
            self.id
        }

        async fn solicit_bid(&self, sub_task: &SubTask) -> Option<Bid> {
            Some(Bid::new(sub_task.id, self.id, self.cost, 0.9))
        }

        async fn propose(&self, _task: &Task) -> Option<Proposal> {
            None
        }

        async fn heartbeat(&self, _sub_task_id: SubTaskId) -> LivenessSignal {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            self.signal
        }
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Complete,
        Slow(Duration),
        Hang,
        Fail,
    }

    #[derive(Default)]
    struct ScriptedSandbox {
        behaviours: HashMap<AgentId, Behaviour>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SandboxExecutor for ScriptedSandbox {
        async fn execute(
            &self,
            request: ExecutionRequest,
            context: Arc<SharedContext>,
            cancel: CancellationToken,
        ) -> Result<ExecutionOutput, SandboxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let behaviour = self.behaviours.get(&request.agent_id).copied().unwrap_or(Behaviour::Complete);
            if let Behaviour::Slow(delay) = behaviour {
                tokio::time::sleep(delay).await;
            }
            match behaviour {
                Behaviour::Complete | Behaviour::Slow(_) => Ok(ExecutionOutput {
                    result: serde_json::json!({
                        "agent": request.agent_id.to_string(),
                        "task": context.task_id().to_string(),
                    }),
                    logs: Vec::new(),
                }),
                Behaviour::Hang => {
                    cancel.cancelled().await;
                    Err(SandboxError::Cancelled)
                }
                Behaviour::Fail => Err(SandboxError::ExecutionFailed("tool crashed".to_string())),
            }
        }
    }

    struct Harness {
        coordinator: ExecutionCoordinator,
        allocator: Arc<MarketAllocator>,
        directory: Arc<CapabilityDirectory>,
        sandbox: Arc<ScriptedSandbox>,
        workers: Vec<Arc<Worker>>,
        participants: Vec<Arc<dyn SwarmParticipant>>,
        ids: Vec<AgentId>,
    }

    fn harness(workers: &[(f64, LivenessSignal, Behaviour)]) -> Harness {
        let directory = Arc::new(CapabilityDirectory::new(DirectoryConfig::default()));
        let bus = EventBus::new(64);
        let allocator = Arc::new(MarketAllocator::new(
            MarketConfig {
                bid_timeout: Duration::from_millis(50),
                ..MarketConfig::default()
            },
            Arc::clone(&directory),
            bus.clone(),
        ));

        let mut behaviours = HashMap::new();
        let mut participants: Vec<Arc<dyn SwarmParticipant>> = Vec::new();
        let mut handles = Vec::new();
        let mut ids = Vec::new();
        for &(cost, signal, behaviour) in workers {
            let id = AgentId::new();
            directory
                .register_with_reputation(id, CapabilitySet::new().with("code", 0.9), Some(0.9))
                .unwrap();
            behaviours.insert(id, behaviour);
            let worker = Arc::new(Worker {
                id,
                cost,
                signal,
                heartbeats: AtomicUsize::new(0),
            });
            participants.push(worker.clone());
            handles.push(worker);
            ids.push(id);
        }
        let sandbox = Arc::new(ScriptedSandbox {
            behaviours,
            calls: AtomicUsize::new(0),
        });

        let coordinator = ExecutionCoordinator::new(
            ExecutionConfig {
                liveness_interval: Duration::from_millis(10),
                liveness_timeout: Duration::from_millis(10),
                missed_checks: 2,
                max_reassignments: 2,
                cooldown: Duration::from_secs(60),
            },
            Arc::clone(&allocator),
            Arc::clone(&directory),
            sandbox.clone(),
            bus,
        );

        Harness {
            coordinator,
            allocator,
            directory,
            sandbox,
            workers: handles,
            participants,
            ids,
        }
    }

    fn task() -> Task {
        Task::new(TaskPayload::new("fix the build").with_requirement("code", 1.0), 0.1)
    }

    async fn run(h: &Harness, task: &Task) -> TaskReport {
        let sub_task = SubTask::from_task(task);
        let initial = h
            .allocator
            .allocate_one(&sub_task, &h.participants, &BTreeSet::new(), 0)
            .await;
        h.coordinator
            .execute(task, vec![(sub_task, initial)], &h.participants)
            .await
    }

    #[tokio::test]
    async fn test_healthy_agent_completes() {
        let h = harness(&[(1.0, LivenessSignal::Alive, Behaviour::Complete)]);
        let task = task();

        let report = run(&h, &task).await;

        assert_eq!(report.state, TaskState::Completed);
        assert!(report.failure.is_none());
        let sub = &report.sub_tasks[0];
        assert_eq!(sub.assigned_agent(), Some(h.ids[0]));
        assert_eq!(sub.reassignments, 0);
        assert_eq!(sub.output.as_ref().unwrap()["task"], task.id.to_string());
        assert!(h.directory.reputation(h.ids[0]) > 0.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_after_sub_task_completes() {
        let h = harness(&[(
            1.0,
            LivenessSignal::Alive,
            Behaviour::Slow(Duration::from_millis(35)),
        )]);

        let report = run(&h, &task()).await;
        assert_eq!(report.state, TaskState::Completed);
        let seen = h.workers[0].heartbeats.load(Ordering::SeqCst);
        assert!(seen > 0);

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.workers[0].heartbeats.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_stall_moves_sub_task_to_another_agent() {
        let h = harness(&[
            (1.0, LivenessSignal::Stalled, Behaviour::Hang),
            (2.0, LivenessSignal::Alive, Behaviour::Complete),
        ]);

        let report = run(&h, &task()).await;

        assert_eq!(report.state, TaskState::Completed);
        let sub = &report.sub_tasks[0];
        assert_eq!(sub.reassignments, 1);
        assert_eq!(sub.allocations.len(), 2);
        assert!(sub.allocations[0].superseded);
        assert_eq!(sub.allocations[0].agent_id, h.ids[0]);
        assert_eq!(sub.allocations[1].round, 1);
        assert_eq!(sub.assigned_agent(), Some(h.ids[1]));

        assert!(h.directory.reputation(h.ids[0]) < 0.9);
        assert!(h.allocator.is_cooling_down(h.ids[0]));
    }

    #[tokio::test]
    async fn test_silent_agent_counts_as_stalled() {
        let h = harness(&[
            (1.0, LivenessSignal::Missed, Behaviour::Hang),
            (2.0, LivenessSignal::Alive, Behaviour::Complete),
        ]);

        let report = run(&h, &task()).await;

        assert_eq!(report.state, TaskState::Completed);
        assert_eq!(report.sub_tasks[0].assigned_agent(), Some(h.ids[1]));
    }

    #[tokio::test]
    async fn test_failures_exhaust_retries() {
        let h = harness(&[
            (1.0, LivenessSignal::Alive, Behaviour::Fail),
            (2.0, LivenessSignal::Alive, Behaviour::Fail),
            (3.0, LivenessSignal::Alive, Behaviour::Fail),
            (4.0, LivenessSignal::Alive, Behaviour::Complete),
        ]);

        let report = run(&h, &task()).await;

        assert_eq!(report.state, TaskState::Failed);
        let reason = report.failure.unwrap();
        assert_eq!(reason.kind, FailureKind::RetriesExhausted);
        assert_eq!(reason.last_error, Some(FailureKind::ExecutionFailure));
        assert_eq!(reason.reassignments, 2);

        let sub = &report.sub_tasks[0];
        assert_eq!(sub.allocations.len(), 3);
        assert_eq!(sub.allocations.iter().filter(|a| a.superseded).count(), 2);
        assert_eq!(h.sandbox.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_replacement_fails_with_allocation_kind() {
        let h = harness(&[(1.0, LivenessSignal::Alive, Behaviour::Fail)]);

        let report = run(&h, &task()).await;

        let reason = report.failure.unwrap();
        assert_eq!(reason.kind, FailureKind::NoCapableAgent);
        assert_eq!(reason.reassignments, 1);
        assert_eq!(report.sub_tasks[0].allocations.len(), 1);
    }

    #[tokio::test]
    async fn test_unallocated_sub_task_never_executes() {
        let h = harness(&[]);
        let task = task();
        let sub_task = SubTask::from_task(&task);
        let initial = Err(AllocationError::NoCapableAgent {
            sub_task_id: sub_task.id,
            solicited: 0,
        });

        let mut events = h.coordinator.event_bus.subscribe_task(task.id);
        let report = h
            .coordinator
            .execute(&task, vec![(sub_task, initial)], &h.participants)
            .await;

        assert_eq!(report.state, TaskState::Failed);
        assert_eq!(report.failure.unwrap().kind, FailureKind::NoCapableAgent);
        assert!(report.sub_tasks[0].allocations.is_empty());
        assert_eq!(h.sandbox.calls.load(Ordering::SeqCst), 0);

        assert!(matches!(events.recv().await.unwrap(), CoordinationEvent::SubTaskFailed { .. }));
        assert!(matches!(events.recv().await.unwrap(), CoordinationEvent::TaskFailed { .. }));
    }
}
