// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryStore: Per-Agent Tiered Memory
//!
//! Owns the loaded [`AgentMemory`] of every active agent. Each agent's memory
//! sits behind its own async mutex, so writes to one agent are serialized
//! while different agents proceed without contending on a shared lock.
//!
//! ## Skill Records
//!
//! Procedural bindings are written through to the durable store under
//! `StorageKey::SkillConfig { agent, skill }`. Lookups for an agent whose
//! memory is not loaded (for example while it hibernates) are answered from
//! those records.

use dashmap::DashMap;
use hive_core::agent::AgentId;
use hive_core::events::MemoryEvent;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::skill::{SkillBinding, SkillId};
use hive_core::storage::{DurableStore, StorageKey};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::application::consolidation::{
    ConsolidationReport, ConsolidationService, ConsolidationTrigger,
};
use crate::domain::memory::{AgentMemory, InteractionRecord, MemoryLimits, SemanticValue, WorkingEntry};
use crate::domain::snapshot::MemorySnapshot;
use crate::domain::MemoryError;

pub struct MemoryStore {
    memories: DashMap<AgentId, Arc<Mutex<AgentMemory>>>,
    limits: MemoryLimits,
    consolidation: ConsolidationService,
    durable: Arc<dyn DurableStore>,
    event_bus: EventBus,
}

impl MemoryStore {
    pub fn new(limits: MemoryLimits, durable: Arc<dyn DurableStore>, event_bus: EventBus) -> Self {
        Self {
            memories: DashMap::new(),
            limits,
            consolidation: ConsolidationService::new(event_bus.clone()),
            durable,
            event_bus,
        }
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// Create empty memory for `agent_id` unless some is already loaded.
    pub fn create(&self, agent_id: AgentId) {
        self.memories
            .entry(agent_id)
            .or_insert_with(|| Arc::new(Mutex::new(AgentMemory::new(self.limits))));
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.memories.contains_key(&agent_id)
    }

    fn handle(&self, agent_id: AgentId) -> Result<Arc<Mutex<AgentMemory>>, MemoryError> {
        // Clone the Arc out so the shard lock is released before awaiting.
        self.memories
            .get(&agent_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MemoryError::UnknownAgent(agent_id))
    }

    /// Exclusive access to one agent's memory. Held by the lifecycle manager
    /// for the duration of a hibernate so no append interleaves.
    ///
    /// A caller that queued behind an unload never gets the stale copy: it
    /// re-resolves and fails with `UnknownAgent` if nothing is loaded anymore.
    pub async fn lock(&self, agent_id: AgentId) -> Result<OwnedMutexGuard<AgentMemory>, MemoryError> {
        loop {
            let handle = self.handle(agent_id)?;
            let guard = Arc::clone(&handle).lock_owned().await;
            let current = self
                .memories
                .get(&agent_id)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), &handle));
            if current {
                return Ok(guard);
            }
            debug!(agent_id = %agent_id, "Memory was unloaded while waiting for it");
        }
    }

    /// Record an interaction; consolidates when the episodic tier overflows.
    pub async fn append(
        &self,
        agent_id: AgentId,
        record: InteractionRecord,
    ) -> Result<Option<ConsolidationReport>, MemoryError> {
        let mut memory = self.lock(agent_id).await?;

        if memory.append(record) {
            let report = self
                .consolidation
                .run(agent_id, &mut memory, ConsolidationTrigger::Overflow);
            return Ok(Some(report));
        }
        Ok(None)
    }

    /// Force a consolidation pass regardless of episodic length.
    pub async fn consolidate(&self, agent_id: AgentId) -> Result<ConsolidationReport, MemoryError> {
        let mut memory = self.lock(agent_id).await?;
        Ok(self
            .consolidation
            .run(agent_id, &mut memory, ConsolidationTrigger::Manual))
    }

    pub async fn serialize(&self, agent_id: AgentId) -> Result<MemorySnapshot, MemoryError> {
        let memory = self.lock(agent_id).await?;
        Ok(memory.snapshot())
    }

    /// Rebuild memory from snapshot bytes under this store's limits.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<AgentMemory, MemoryError> {
        let snapshot = MemorySnapshot::from_bytes(bytes)?;
        Ok(AgentMemory::restore(snapshot, self.limits))
    }

    /// Load memory for `agent_id`, replacing whatever was loaded.
    pub fn install(&self, agent_id: AgentId, memory: AgentMemory) {
        self.memories.insert(agent_id, Arc::new(Mutex::new(memory)));
    }

    /// Unload memory. Durable skill records are left in place.
    pub fn remove(&self, agent_id: AgentId) -> bool {
        self.memories.remove(&agent_id).is_some()
    }

    pub async fn recall(&self, agent_id: AgentId, key: &str) -> Result<Option<SemanticValue>, MemoryError> {
        let memory = self.lock(agent_id).await?;
        Ok(memory.recall(key).cloned())
    }

    pub async fn working(&self, agent_id: AgentId) -> Result<Vec<WorkingEntry>, MemoryError> {
        let memory = self.lock(agent_id).await?;
        Ok(memory.working().cloned().collect())
    }

    /// Bind a skill in procedural memory and persist its record.
    ///
    /// The record is written first; if the durable store fails, procedural
    /// memory is left unchanged.
    pub async fn bind_skill(&self, agent_id: AgentId, binding: SkillBinding) -> Result<(), MemoryError> {
        let mut memory = self.lock(agent_id).await?;

        let key = StorageKey::SkillConfig {
            agent: agent_id,
            skill: binding.skill_id.clone(),
        };
        let bytes = serde_json::to_vec(&binding).map_err(|e| MemoryError::Serialization(e.to_string()))?;
        self.durable.put(&key, bytes).await?;

        let skill_id = binding.skill_id.clone();
        let bound_at = binding.bound_at;
        if memory.bind_skill(binding).is_some() {
            debug!(agent_id = %agent_id, skill_id = %skill_id, "Replaced existing skill binding");
        }

        self.event_bus.publish_memory_event(MemoryEvent::SkillBound {
            agent_id,
            skill_id,
            bound_at,
        });
        Ok(())
    }

    pub async fn skill(&self, agent_id: AgentId, skill_id: &SkillId) -> Result<Option<SkillBinding>, MemoryError> {
        if let Ok(memory) = self.lock(agent_id).await {
            return Ok(memory.skill(skill_id).cloned());
        }
        self.load_skill_record(agent_id, skill_id.clone()).await
    }

    /// All bindings of one agent, ordered by skill id.
    pub async fn skills(&self, agent_id: AgentId) -> Result<Vec<SkillBinding>, MemoryError> {
        if let Ok(memory) = self.lock(agent_id).await {
            return Ok(memory.skills().cloned().collect());
        }

        let prefix = StorageKey::skills_prefix(agent_id);
        let mut bindings = Vec::new();
        for key in self.durable.keys_with_prefix(&prefix).await? {
            let Some(skill) = key.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(binding) = self.load_skill_record(agent_id, SkillId::new(skill)).await? {
                bindings.push(binding);
            }
        }
        Ok(bindings)
    }

    async fn load_skill_record(
        &self,
        agent_id: AgentId,
        skill: SkillId,
    ) -> Result<Option<SkillBinding>, MemoryError> {
        let key = StorageKey::SkillConfig { agent: agent_id, skill };
        let Some(bytes) = self.durable.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(binding) => Ok(Some(binding)),
            Err(e) => {
                warn!(key = %key, "Skipping unreadable skill record: {}", e);
                Ok(None)
            }
        }
    }
}
