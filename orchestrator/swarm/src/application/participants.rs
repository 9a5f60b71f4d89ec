// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use dashmap::DashMap;
use hive_core::agent::AgentId;
use std::sync::Arc;

use crate::domain::participant::SwarmParticipant;

/// Handles for every agent that can take part in coordination.
#[derive(Default)]
pub struct ParticipantPool {
    participants: DashMap<AgentId, Arc<dyn SwarmParticipant>>,
}

impl ParticipantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, participant: Arc<dyn SwarmParticipant>) {
        self.participants.insert(participant.agent_id(), participant);
    }

    pub fn remove(&self, agent_id: AgentId) -> Option<Arc<dyn SwarmParticipant>> {
        self.participants.remove(&agent_id).map(|(_, p)| p)
    }

    pub fn get(&self, agent_id: AgentId) -> Option<Arc<dyn SwarmParticipant>> {
        self.participants.get(&agent_id).map(|e| Arc::clone(e.value()))
    }

    /// All participants ordered by agent id.
    pub fn all(&self) -> Vec<Arc<dyn SwarmParticipant>> {
        let mut all: Vec<_> = self.participants.iter().map(|e| Arc::clone(e.value())).collect();
        all.sort_by_key(|p| p.agent_id());
        all
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
