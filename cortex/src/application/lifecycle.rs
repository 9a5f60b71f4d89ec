// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Lifecycle Manager
//!
//! Drives the Active ⇄ Hibernating → Terminated state machine and moves an
//! agent's memory to and from the durable store.
//!
//! | Operation | From | To | Durable effect |
//! |-----------|------|----|----------------|
//! | `hibernate` | Active | Hibernating | writes `HibernationRecord` under `AgentSnapshot` |
//! | `wake` | Hibernating (or unknown to this process) | Active | reads the record back |
//! | `terminate` | Active | Terminated | deletes the record |
//!
//! A closed transport channel is the only external trigger; it maps to
//! `hibernate`. `wake` on an Active agent is an error, not a no-op.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hive_core::agent::{Agent, AgentId, LifecycleState, SessionMarker, TransitionError};
use hive_core::events::AgentLifecycleEvent;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::storage::{DurableStore, StorageError, StorageKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::memory_store::MemoryStore;
use crate::domain::memory::AgentMemory;
use crate::domain::snapshot::HibernationRecord;
use crate::domain::MemoryError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Agent {0} is already active")]
    AgentAlreadyActive(AgentId),

    #[error("Agent {0} has been terminated")]
    AgentTerminated(AgentId),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What `wake` hands back to the caller.
#[derive(Debug, Clone)]
pub struct RestoredAgent {
    pub agent: Agent,
    pub preferences: BTreeMap<String, String>,
    pub session: SessionMarker,
}

/// Live reputation for agents, read when they hibernate.
pub trait ReputationSource: Send + Sync {
    /// `None` when the source does not track the agent.
    fn reputation(&self, agent_id: AgentId) -> Option<f64>;
}

pub struct LifecycleManager {
    agents: DashMap<AgentId, Arc<Mutex<Agent>>>,
    memory: Arc<MemoryStore>,
    durable: Arc<dyn DurableStore>,
    reputation: Option<Arc<dyn ReputationSource>>,
    event_bus: EventBus,
}

impl LifecycleManager {
    pub fn new(memory: Arc<MemoryStore>, durable: Arc<dyn DurableStore>, event_bus: EventBus) -> Self {
        Self {
            agents: DashMap::new(),
            memory,
            durable,
            reputation: None,
            event_bus,
        }
    }

    /// Persist the reputation `source` reports with every hibernation.
    pub fn with_reputation_source(mut self, source: Arc<dyn ReputationSource>) -> Self {
        self.reputation = Some(source);
        self
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    fn handle(&self, agent_id: AgentId) -> Option<Arc<Mutex<Agent>>> {
        self.agents.get(&agent_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Add an Active agent with empty memory.
    pub fn register(&self, agent: Agent) -> AgentId {
        let agent_id = agent.id;
        let name = agent.name.clone();

        self.agents.insert(agent_id, Arc::new(Mutex::new(agent)));
        self.memory.create(agent_id);

        info!(agent_id = %agent_id, name = %name, "Agent registered");
        self.event_bus
            .publish_agent_event(AgentLifecycleEvent::AgentRegistered {
                agent_id,
                name,
                registered_at: Utc::now(),
            });
        agent_id
    }

    pub async fn agent(&self, agent_id: AgentId) -> Option<Agent> {
        let handle = self.handle(agent_id)?;
        let agent = handle.lock().await;
        Some(agent.clone())
    }

    pub async fn state(&self, agent_id: AgentId) -> Option<LifecycleState> {
        let handle = self.handle(agent_id)?;
        let state = handle.lock().await.state;
        Some(state)
    }

    pub async fn active_agents(&self) -> Vec<Agent> {
        let handles: Vec<_> = self.agents.iter().map(|e| Arc::clone(e.value())).collect();
        let mut active = Vec::new();
        for handle in handles {
            let agent = handle.lock().await;
            if agent.is_active() {
                active.push(agent.clone());
            }
        }
        active.sort_by_key(|a| a.id);
        active
    }

    /// Persist the agent's memory and identity, then unload its memory.
    pub async fn hibernate(&self, agent_id: AgentId) -> Result<SessionMarker, LifecycleError> {
        let handle = self.handle(agent_id).ok_or(LifecycleError::AgentNotFound(agent_id))?;
        let mut agent = handle.lock().await;
        if agent.state.is_terminal() {
            return Err(LifecycleError::AgentTerminated(agent_id));
        }

        let mut hibernated = agent.clone();
        hibernated.transition(LifecycleState::Hibernating)?;
        if let Some(reputation) = self.reputation.as_ref().and_then(|s| s.reputation(agent_id)) {
            hibernated.reputation = reputation;
        }

        // Held until the memory is unloaded so no append slips in after the
        // snapshot is taken.
        let memory = self.memory.lock(agent_id).await?;

        let session = SessionMarker::new();
        let hibernated_at = Utc::now();
        let record = HibernationRecord {
            session,
            agent: hibernated.clone(),
            memory: memory.snapshot(),
            hibernated_at,
        };
        self.durable
            .put(&StorageKey::AgentSnapshot(agent_id), record.to_bytes()?)
            .await?;

        *agent = hibernated;
        self.memory.remove(agent_id);
        drop(memory);

        metrics::counter!("hive_agents_hibernated_total").increment(1);
        info!(agent_id = %agent_id, session = %session, "Agent hibernated");
        self.event_bus
            .publish_agent_event(AgentLifecycleEvent::AgentHibernated {
                agent_id,
                session,
                hibernated_at,
            });

        Ok(session)
    }

    /// Restore a hibernated agent from its durable record.
    ///
    /// Works for agents this process has never seen, as long as a record
    /// exists for them.
    pub async fn wake(&self, agent_id: AgentId) -> Result<RestoredAgent, LifecycleError> {
        let existing = self.handle(agent_id);
        let mut guard = match &existing {
            Some(handle) => Some(handle.lock().await),
            None => None,
        };

        if let Some(agent) = guard.as_deref() {
            match agent.state {
                LifecycleState::Active => return Err(LifecycleError::AgentAlreadyActive(agent_id)),
                LifecycleState::Terminated => return Err(LifecycleError::AgentTerminated(agent_id)),
                LifecycleState::Hibernating => {}
            }
        }

        let bytes = self
            .durable
            .get(&StorageKey::AgentSnapshot(agent_id))
            .await?
            .ok_or(LifecycleError::AgentNotFound(agent_id))?;
        let record = HibernationRecord::from_bytes(&bytes)?;
        if record.agent.id != agent_id {
            return Err(MemoryError::CorruptSnapshot(format!(
                "record belongs to agent {}",
                record.agent.id
            ))
            .into());
        }

        let mut agent = record.agent;
        agent.transition(LifecycleState::Active)?;
        let memory = AgentMemory::restore(record.memory, self.memory.limits());

        match guard.as_deref_mut() {
            Some(current) => *current = agent.clone(),
            None => match self.agents.entry(agent_id) {
                Entry::Occupied(_) => return Err(LifecycleError::AgentAlreadyActive(agent_id)),
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(agent.clone())));
                }
            },
        }
        self.memory.install(agent_id, memory);
        drop(guard);

        info!(agent_id = %agent_id, session = %record.session, "Agent woken");
        self.event_bus.publish_agent_event(AgentLifecycleEvent::AgentWoken {
            agent_id,
            session: record.session,
            woken_at: Utc::now(),
        });

        Ok(RestoredAgent {
            preferences: agent.preferences.clone(),
            agent,
            session: record.session,
        })
    }

    /// Return the agent if Active, waking it first if it hibernates.
    pub async fn resume(&self, agent_id: AgentId) -> Result<Agent, LifecycleError> {
        if let Some(agent) = self.agent(agent_id).await {
            match agent.state {
                LifecycleState::Active => return Ok(agent),
                LifecycleState::Terminated => return Err(LifecycleError::AgentTerminated(agent_id)),
                LifecycleState::Hibernating => {}
            }
        }

        match self.wake(agent_id).await {
            Ok(restored) => {
                debug!(agent_id = %agent_id, "Resumed hibernating agent on demand");
                Ok(restored.agent)
            }
            // Another caller woke it first.
            Err(LifecycleError::AgentAlreadyActive(_)) => self
                .agent(agent_id)
                .await
                .ok_or(LifecycleError::AgentNotFound(agent_id)),
            Err(e) => Err(e),
        }
    }

    /// Permanently retire an Active agent and discard its durable record.
    pub async fn terminate(&self, agent_id: AgentId) -> Result<(), LifecycleError> {
        let handle = self.handle(agent_id).ok_or(LifecycleError::AgentNotFound(agent_id))?;
        let mut agent = handle.lock().await;
        if agent.state.is_terminal() {
            return Err(LifecycleError::AgentTerminated(agent_id));
        }
        agent.transition(LifecycleState::Terminated)?;

        self.memory.remove(agent_id);
        self.durable.delete(&StorageKey::AgentSnapshot(agent_id)).await?;

        info!(agent_id = %agent_id, "Agent terminated");
        self.event_bus
            .publish_agent_event(AgentLifecycleEvent::AgentTerminated {
                agent_id,
                terminated_at: Utc::now(),
            });
        Ok(())
    }

    /// Transport signalled that the agent's channel closed.
    ///
    /// Hibernates an Active agent; anything else is left alone.
    pub async fn on_channel_closed(&self, agent_id: AgentId) -> Result<Option<SessionMarker>, LifecycleError> {
        match self.state(agent_id).await {
            Some(LifecycleState::Active) => self.hibernate(agent_id).await.map(Some),
            Some(state) => {
                debug!(agent_id = %agent_id, state = %state, "Channel closed for inactive agent");
                Ok(None)
            }
            None => Err(LifecycleError::AgentNotFound(agent_id)),
        }
    }
}
