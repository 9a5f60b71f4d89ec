// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end coordination: decompose → allocate → execute through the
//! runtime, against scripted agents and a scripted sandbox.

use async_trait::async_trait;
use dashmap::DashMap;
use hive_core::agent::{Agent, AgentId, CapabilitySet};
use hive_core::config::HiveConfigSpec;
use hive_core::events::CoordinationEvent;
use hive_core::inference::{GenerationOptions, GenerationResponse, InferenceError, InferenceProvider};
use hive_core::infrastructure::event_bus::{EventBus, TaskEventReceiver};
use hive_core::infrastructure::storage::InMemoryDurableStore;
use hive_core::market::Bid;
use hive_core::sandbox::{ExecutionOutput, ExecutionRequest, SandboxError, SandboxExecutor, SharedContext};
use hive_core::task::{FailureKind, SubTask, SubTaskId, Task, TaskPayload, TaskState};
use hive_swarm::application::HiveRuntime;
use hive_swarm::domain::{LivenessSignal, Proposal, SubTaskDescriptor, SwarmParticipant};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct ScriptedAgent {
    id: AgentId,
    /// Bid cost per work unit; `default_cost` for anything else.
    costs: BTreeMap<String, f64>,
    default_cost: f64,
    proposal: Option<Proposal>,
    liveness: LivenessSignal,
    bids: AtomicUsize,
}

impl ScriptedAgent {
    fn new(id: AgentId, default_cost: f64) -> Self {
        Self {
            id,
            costs: BTreeMap::new(),
            default_cost,
            proposal: None,
            liveness: LivenessSignal::Alive,
            bids: AtomicUsize::new(0),
        }
    }

    fn cost_for(mut self, unit: &str, cost: f64) -> Self {
        self.costs.insert(unit.to_string(), cost);
        self
    }

    fn proposing(mut self, proposal: Proposal) -> Self {
        self.proposal = Some(proposal);
        self
    }

    fn liveness(mut self, signal: LivenessSignal) -> Self {
        self.liveness = signal;
        self
    }
}

#[async_trait]
impl SwarmParticipant for ScriptedAgent {
    fn agent_id(&self) -> AgentId {
        self.id
    }

    async fn solicit_bid(&self, sub_task: &SubTask) -> Option<Bid> {
        self.bids.fetch_add(1, Ordering::SeqCst);
        let cost = sub_task
            .payload
            .units
            .iter()
            .find_map(|unit| self.costs.get(&unit.0).copied())
            .unwrap_or(self.default_cost);
        Some(Bid::new(sub_task.id, self.id, cost, 0.9))
    }

    async fn propose(&self, _task: &Task) -> Option<Proposal> {
        self.proposal.clone()
    }

    async fn heartbeat(&self, _sub_task_id: SubTaskId) -> LivenessSignal {
        self.liveness
    }
}

#[derive(Clone, Copy)]
enum Behaviour {
    Complete,
    Hang,
}

#[derive(Default)]
struct ScriptedSandbox {
    behaviours: DashMap<AgentId, Behaviour>,
    executed: DashMap<SubTaskId, AgentId>,
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
        let behaviour = self
            .behaviours
            .get(&request.agent_id)
            .map(|b| *b)
            .unwrap_or(Behaviour::Complete);
        match behaviour {
            Behaviour::Complete => {
                self.executed.insert(request.sub_task.id, request.agent_id);
                Ok(ExecutionOutput {
                    result: serde_json::json!({
                        "description": request.sub_task.payload.description,
                        "task": context.description(),
                    }),
                    logs: vec![format!("attempt {}", request.attempt)],
                })
            }
            Behaviour::Hang => {
                cancel.cancelled().await;
                Err(SandboxError::Cancelled)
            }
        }
    }
}

struct SilentModel;

#[async_trait]
impl InferenceProvider for SilentModel {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationResponse, InferenceError> {
        Err(InferenceError::Provider("no model in coordination tests".to_string()))
    }
}

struct Hive {
    runtime: HiveRuntime,
    sandbox: Arc<ScriptedSandbox>,
}

fn hive() -> Hive {
    let mut spec = HiveConfigSpec::default();
    spec.decomposition.proposal_timeout = Duration::from_millis(100);
    spec.market.bid_timeout = Duration::from_millis(100);
    spec.execution.liveness_interval = Duration::from_millis(10);
    spec.execution.liveness_timeout = Duration::from_millis(10);
    spec.execution.missed_checks = 3;
    spec.execution.cooldown = Duration::from_secs(60);

    let sandbox = Arc::new(ScriptedSandbox::default());
    let runtime = HiveRuntime::new(
        spec,
        Arc::new(InMemoryDurableStore::new()),
        Arc::new(SilentModel),
        sandbox.clone(),
        EventBus::new(256),
    )
    .unwrap();
    Hive { runtime, sandbox }
}

impl Hive {
    fn join(&self, name: &str, reputation: f64, participant: impl FnOnce(AgentId) -> ScriptedAgent) -> Arc<ScriptedAgent> {
        let mut agent = Agent::new(name, CapabilitySet::new().with("research", 0.9));
        agent.reputation = reputation;
        let participant = Arc::new(participant(agent.id));
        self.runtime
            .register_agent(agent, Some(participant.clone()))
            .unwrap();
        participant
    }

    fn behave(&self, agent_id: AgentId, behaviour: Behaviour) {
        self.sandbox.behaviours.insert(agent_id, behaviour);
    }
}

fn split_a_b() -> Proposal {
    Proposal::Split {
        sub_tasks: vec![
            SubTaskDescriptor::new("collect sources", ["a"]),
            SubTaskDescriptor::new("write summary", ["b"]),
        ],
    }
}

async fn events_until_terminal(rx: &mut TaskEventReceiver) -> Vec<CoordinationEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no terminal event in time")
            .expect("event bus closed");
        let terminal = matches!(
            event,
            CoordinationEvent::TaskCompleted { .. } | CoordinationEvent::TaskFailed { .. }
        );
        events.push(event);
        if terminal {
            return events;
        }
    }
}

#[tokio::test]
async fn test_two_sub_tasks_go_to_the_two_best_trusted_bidders() {
    let hive = hive();
    let strong = hive.join("strong", 0.9, |id| {
        ScriptedAgent::new(id, 4.0).cost_for("a", 1.0).proposing(split_a_b())
    });
    let steady = hive.join("steady", 0.6, |id| {
        ScriptedAgent::new(id, 4.0).cost_for("b", 1.0).proposing(split_a_b())
    });
    // Cheapest bidder by far, but below the bidder gate.
    let shaky = hive.join("shaky", 0.4, |id| ScriptedAgent::new(id, 0.1).proposing(Proposal::Atomic));

    let task = Task::new(
        TaskPayload::new("market research")
            .with_units(["a", "b"])
            .with_requirement("research", 1.0),
        0.5,
    );
    let mut events = hive.runtime.event_bus().subscribe_task(task.id);

    let report = hive.runtime.pipeline().run(task.clone()).await;

    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.sub_tasks.len(), 2);
    let holders: BTreeSet<AgentId> = report.sub_tasks.iter().filter_map(|s| s.assigned_agent()).collect();
    assert_eq!(holders, BTreeSet::from([strong.id, steady.id]));
    assert_eq!(shaky.bids.load(Ordering::SeqCst), 0);
    assert!(report.sub_tasks.iter().all(|s| s.output.is_some()));

    let events = events_until_terminal(&mut events).await;
    assert!(events.iter().any(|e| matches!(
        e,
        CoordinationEvent::TaskDecomposed { outcome, sub_task_count: 2, .. } if outcome == "consensus"
    )));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, CoordinationEvent::SubTaskCompleted { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_simple_task_runs_undecomposed() {
    let hive = hive();
    let worker = hive.join("worker", 0.7, |id| ScriptedAgent::new(id, 1.0).proposing(split_a_b()));

    let task = Task::new(
        TaskPayload::new("quick lookup").with_units(["a", "b"]).with_requirement("research", 1.0),
        0.2,
    );
    let report = hive.runtime.pipeline().run(task.clone()).await;

    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.sub_tasks.len(), 1);
    assert_eq!(report.sub_tasks[0].sub_task_id, SubTaskId::from(task.id));
    assert_eq!(report.sub_tasks[0].assigned_agent(), Some(worker.id));
}

#[tokio::test]
async fn test_stalled_agent_is_replaced() {
    let hive = hive();
    let stalling = hive.join("stalling", 0.9, |id| {
        ScriptedAgent::new(id, 1.0).liveness(LivenessSignal::Missed)
    });
    let backup = hive.join("backup", 0.8, |id| ScriptedAgent::new(id, 2.0));
    hive.behave(stalling.id, Behaviour::Hang);

    let task = Task::new(TaskPayload::new("crawl").with_requirement("research", 1.0), 0.1);
    let mut events = hive.runtime.event_bus().subscribe_task(task.id);

    let report = hive.runtime.pipeline().run(task.clone()).await;

    assert_eq!(report.state, TaskState::Completed);
    let sub = &report.sub_tasks[0];
    assert_eq!(sub.reassignments, 1);
    assert_eq!(sub.assigned_agent(), Some(backup.id));
    assert_eq!(sub.allocations[0].agent_id, stalling.id);
    assert!(sub.allocations[0].superseded);
    assert_eq!(
        hive.sandbox.executed.get(&sub.sub_task_id).map(|a| *a),
        Some(backup.id)
    );
    assert!(hive.runtime.directory().reputation(stalling.id) < 0.9);

    let events = events_until_terminal(&mut events).await;
    assert!(events.iter().any(|e| matches!(
        e,
        CoordinationEvent::StallDetected { agent_id, .. } if *agent_id == stalling.id
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        CoordinationEvent::SubTaskReassigned { reassignments: 1, .. }
    )));
}

#[tokio::test]
async fn test_sub_task_fails_after_two_reassignments() {
    let hive = hive();
    let mut stallers = Vec::new();
    for (name, cost) in [("first", 1.0), ("second", 2.0), ("third", 3.0), ("fourth", 4.0)] {
        let agent = hive.join(name, 0.9, |id| ScriptedAgent::new(id, cost).liveness(LivenessSignal::Stalled));
        hive.behave(agent.id, Behaviour::Hang);
        stallers.push(agent);
    }

    let task = Task::new(TaskPayload::new("doomed").with_requirement("research", 1.0), 0.1);
    let report = hive.runtime.pipeline().run(task).await;

    assert_eq!(report.state, TaskState::Failed);
    let reason = report.failure.expect("failed task carries a reason");
    assert_eq!(reason.kind, FailureKind::RetriesExhausted);
    assert_eq!(reason.last_error, Some(FailureKind::StallDetected));
    assert_eq!(reason.reassignments, 2);

    let tried: Vec<AgentId> = report.sub_tasks[0].allocations.iter().map(|a| a.agent_id).collect();
    assert_eq!(tried, vec![stallers[0].id, stallers[1].id, stallers[2].id]);
    assert_eq!(hive.sandbox.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_no_capable_agent_never_executes() {
    let hive = hive();
    hive.join("researcher", 0.9, |id| ScriptedAgent::new(id, 1.0));

    let task = Task::new(TaskPayload::new("star charts").with_requirement("astronomy", 1.0), 0.1);
    let report = hive.runtime.pipeline().run(task).await;

    assert_eq!(report.state, TaskState::Failed);
    let reason = report.failure.unwrap();
    assert_eq!(reason.kind, FailureKind::NoCapableAgent);
    assert_eq!(reason.reassignments, 0);
    assert!(report.sub_tasks[0].allocations.is_empty());
    assert_eq!(hive.sandbox.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hibernating_agents_are_not_candidates() {
    let hive = hive();
    let sleeper = hive.join("sleeper", 0.9, |id| ScriptedAgent::new(id, 1.0));
    hive.runtime.close_channel(sleeper.id).await.unwrap();

    let task = Task::new(TaskPayload::new("night shift").with_requirement("research", 1.0), 0.1);
    let report = hive.runtime.pipeline().run(task).await;

    assert_eq!(report.failure.unwrap().kind, FailureKind::NoCapableAgent);
    assert_eq!(sleeper.bids.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_overlapping_split_falls_back_to_whole_task() {
    let hive = hive();
    let overlapping = Proposal::Split {
        sub_tasks: vec![
            SubTaskDescriptor::new("first half", ["a", "b"]),
            SubTaskDescriptor::new("second half", ["b"]),
        ],
    };
    let worker = hive.join("worker", 0.9, |id| ScriptedAgent::new(id, 1.0).proposing(overlapping));

    let task = Task::new(
        TaskPayload::new("report").with_units(["a", "b"]).with_requirement("research", 1.0),
        0.9,
    );
    let mut events = hive.runtime.event_bus().subscribe_task(task.id);
    let report = hive.runtime.pipeline().run(task.clone()).await;

    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.sub_tasks.len(), 1);
    assert_eq!(report.sub_tasks[0].assigned_agent(), Some(worker.id));

    let events = events_until_terminal(&mut events).await;
    assert!(events.iter().any(|e| matches!(
        e,
        CoordinationEvent::TaskDecomposed { outcome, .. } if outcome == "fallback"
    )));
}
