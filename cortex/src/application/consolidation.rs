// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory Consolidation
//!
//! The "sleep cycle" of an agent's memory: recurring episodes are promoted
//! into semantic memory and the episodic tier is cut back to the retained
//! fraction of its capacity.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Run a consolidation pass on one agent's memory and publish
//!   the outcome

use chrono::{DateTime, Utc};
use hive_core::agent::AgentId;
use hive_core::events::MemoryEvent;
use hive_core::infrastructure::event_bus::EventBus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::memory::AgentMemory;

/// What started a consolidation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationTrigger {
    /// Episodic tier exceeded its capacity during `append`.
    Overflow,
    /// Explicit request through the memory command surface.
    Manual,
}

impl ConsolidationTrigger {
    fn as_str(self) -> &'static str {
        match self {
            ConsolidationTrigger::Overflow => "overflow",
            ConsolidationTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub agent_id: AgentId,
    pub trigger: ConsolidationTrigger,
    pub patterns_written: usize,
    pub episodes_trimmed: usize,
    pub episodic_len: usize,
    pub semantic_len: usize,
    pub consolidated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConsolidationService {
    event_bus: EventBus,
}

impl ConsolidationService {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }

    /// Consolidate `memory`, which the caller must hold exclusively.
    pub fn run(
        &self,
        agent_id: AgentId,
        memory: &mut AgentMemory,
        trigger: ConsolidationTrigger,
    ) -> ConsolidationReport {
        debug!(
            agent_id = %agent_id,
            trigger = trigger.as_str(),
            episodic_len = memory.episodic().len(),
            "Running memory consolidation"
        );

        let outcome = memory.consolidate();
        let consolidated_at = Utc::now();

        metrics::counter!("hive_memory_consolidations_total", "trigger" => trigger.as_str())
            .increment(1);

        info!(
            agent_id = %agent_id,
            patterns_written = outcome.patterns_written,
            episodes_trimmed = outcome.episodes_trimmed,
            "Memory consolidated"
        );

        self.event_bus
            .publish_memory_event(MemoryEvent::EpisodesConsolidated {
                agent_id,
                patterns_written: outcome.patterns_written,
                episodes_trimmed: outcome.episodes_trimmed,
                consolidated_at,
            });

        ConsolidationReport {
            agent_id,
            trigger,
            patterns_written: outcome.patterns_written,
            episodes_trimmed: outcome.episodes_trimmed,
            episodic_len: memory.episodic().len(),
            semantic_len: memory.semantic().len(),
            consolidated_at,
        }
    }
}
