// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Memory Aggregate
//!
//! Four tiers owned by exactly one agent:
//!
//! | Tier | Shape | Bound |
//! |------|-------|-------|
//! | Working | perception/response pairs, oldest first | `working_capacity`, FIFO eviction |
//! | Episodic | interaction records, oldest first | `episodic_capacity`, overflow consolidates |
//! | Semantic | pattern key → consolidated value | unbounded, never shrinks |
//! | Procedural | skill id → binding | unbounded |
//!
//! The aggregate holds no locks and performs no I/O; the
//! [`MemoryStore`](crate::application::memory_store::MemoryStore) serializes
//! access per agent.

use chrono::{DateTime, Utc};
use hive_core::config::MemoryConfig;
use hive_core::skill::{SkillBinding, SkillId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::domain::pattern::{extract_patterns, pattern_key};
use crate::domain::snapshot::MemorySnapshot;

/// One perception/response pair in the working window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingEntry {
    pub perception: String,
    pub response: String,
}

/// One completed interaction as recorded in episodic memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub input: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticValue {
    pub value: String,
    /// Matching episodes seen by the most recent pass that wrote this entry.
    pub occurrences: u64,
    pub updated_at: DateTime<Utc>,
}

/// Capacity and consolidation parameters applied to every agent's memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryLimits {
    pub working_capacity: usize,
    pub episodic_capacity: usize,
    /// Fraction of `episodic_capacity` kept after consolidation.
    pub retain_ratio: f64,
    pub pattern_min_occurrences: usize,
}

impl MemoryLimits {
    /// Episodic length after a consolidation pass.
    pub fn retain_len(&self) -> usize {
        let retained = (self.episodic_capacity as f64 * self.retain_ratio).floor() as usize;
        retained.min(self.episodic_capacity)
    }
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for MemoryLimits {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            working_capacity: config.working_capacity,
            episodic_capacity: config.episodic_capacity,
            retain_ratio: config.retain_ratio,
            pattern_min_occurrences: config.pattern_min_occurrences,
        }
    }
}

/// Result of one consolidation pass over a single agent's memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    pub patterns_written: usize,
    pub episodes_trimmed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentMemory {
    working: VecDeque<WorkingEntry>,
    episodic: VecDeque<InteractionRecord>,
    semantic: BTreeMap<String, SemanticValue>,
    procedural: BTreeMap<SkillId, SkillBinding>,
    limits: MemoryLimits,
}

impl AgentMemory {
    pub fn new(limits: MemoryLimits) -> Self {
        Self {
            working: VecDeque::with_capacity(limits.working_capacity),
            episodic: VecDeque::new(),
            semantic: BTreeMap::new(),
            procedural: BTreeMap::new(),
            limits,
        }
    }

    /// Record an interaction in the working and episodic tiers.
    ///
    /// Returns `true` when the episodic tier now exceeds its capacity and a
    /// consolidation pass is due.
    pub fn append(&mut self, record: InteractionRecord) -> bool {
        self.working.push_back(WorkingEntry {
            perception: record.input.clone(),
            response: record.output.clone(),
        });
        while self.working.len() > self.limits.working_capacity {
            self.working.pop_front();
        }

        self.episodic.push_back(record);
        self.needs_consolidation()
    }

    pub fn needs_consolidation(&self) -> bool {
        self.episodic.len() > self.limits.episodic_capacity
    }

    /// Promote recurring episodic patterns into semantic memory. If the
    /// episodic tier is over capacity, keep only the most recent
    /// `retain_len()` episodes; otherwise nothing is trimmed.
    ///
    /// Semantic entries are inserted or overwritten, never removed.
    pub fn consolidate(&mut self) -> ConsolidationOutcome {
        let now = Utc::now();
        let patterns = extract_patterns(self.episodic.iter(), self.limits.pattern_min_occurrences);
        let patterns_written = patterns.len();

        for pattern in patterns {
            self.semantic
                .entry(pattern.key)
                .and_modify(|entry| {
                    entry.value = pattern.value.clone();
                    entry.occurrences = pattern.occurrences;
                    entry.updated_at = now;
                })
                .or_insert_with(|| SemanticValue {
                    value: pattern.value.clone(),
                    occurrences: pattern.occurrences,
                    updated_at: now,
                });
        }

        let episodes_trimmed = if self.needs_consolidation() {
            self.episodic.len().saturating_sub(self.limits.retain_len())
        } else {
            0
        };
        self.episodic.drain(..episodes_trimmed);

        ConsolidationOutcome {
            patterns_written,
            episodes_trimmed,
        }
    }

    pub fn bind_skill(&mut self, binding: SkillBinding) -> Option<SkillBinding> {
        self.procedural.insert(binding.skill_id.clone(), binding)
    }

    pub fn skill(&self, skill_id: &SkillId) -> Option<&SkillBinding> {
        self.procedural.get(skill_id)
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillBinding> {
        self.procedural.values()
    }

    /// Semantic lookup; `key` is normalized the same way consolidation
    /// normalizes episode inputs.
    pub fn recall(&self, key: &str) -> Option<&SemanticValue> {
        self.semantic.get(&pattern_key(key))
    }

    pub fn semantic(&self) -> &BTreeMap<String, SemanticValue> {
        &self.semantic
    }

    pub fn working(&self) -> impl ExactSizeIterator<Item = &WorkingEntry> {
        self.working.iter()
    }

    pub fn episodic(&self) -> impl ExactSizeIterator<Item = &InteractionRecord> {
        self.episodic.iter()
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            working: self.working.iter().cloned().collect(),
            episodic: self.episodic.iter().cloned().collect(),
            semantic: self.semantic.clone(),
            procedural: self.procedural.clone(),
        }
    }

    /// Rebuild memory from a validated snapshot under the current limits.
    ///
    /// A working window larger than the current capacity keeps its newest
    /// entries. An oversized episodic tier is left as-is and consolidates on
    /// the next append.
    pub fn restore(snapshot: MemorySnapshot, limits: MemoryLimits) -> Self {
        let mut working: VecDeque<WorkingEntry> = snapshot.working.into();
        while working.len() > limits.working_capacity {
            working.pop_front();
        }

        Self {
            working,
            episodic: snapshot.episodic.into(),
            semantic: snapshot.semantic,
            procedural: snapshot.procedural,
            limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::skill::SkillTrigger;

    fn limits(working: usize, episodic: usize) -> MemoryLimits {
        MemoryLimits {
            working_capacity: working,
            episodic_capacity: episodic,
            retain_ratio: 0.5,
            pattern_min_occurrences: 2,
        }
    }

    #[test]
    fn test_working_memory_evicts_oldest() {
        let mut memory = AgentMemory::new(limits(3, 100));
        for i in 0..5 {
            memory.append(InteractionRecord::new(format!("in {}", i), format!("out {}", i)));
        }

        let perceptions: Vec<_> = memory.working().map(|e| e.perception.as_str()).collect();
        assert_eq!(perceptions, vec!["in 2", "in 3", "in 4"]);
        assert_eq!(memory.episodic().len(), 5);
    }

    #[test]
    fn test_append_reports_overflow() {
        let mut memory = AgentMemory::new(limits(10, 4));
        for i in 0..4 {
            assert!(!memory.append(InteractionRecord::new(format!("q{}", i), "a")));
        }
        assert!(memory.append(InteractionRecord::new("q4", "a")));
    }

    #[test]
    fn test_consolidation_trims_to_retain_ratio() {
        let mut memory = AgentMemory::new(limits(10, 100));
        for i in 0..101 {
            memory.append(InteractionRecord::new(format!("question {}", i % 10), format!("answer {}", i)));
        }

        let outcome = memory.consolidate();

        assert_eq!(memory.episodic().len(), 50);
        assert_eq!(outcome.episodes_trimmed, 51);
        assert_eq!(outcome.patterns_written, 10);
        // Most recent output wins for a recurring pattern.
        assert_eq!(memory.recall("Question 0").unwrap().value, "answer 100");
        assert_eq!(memory.recall("question 0").unwrap().occurrences, 11);
    }

    #[test]
    fn test_consolidation_within_capacity_keeps_episodes() {
        let mut memory = AgentMemory::new(MemoryLimits::default());
        for i in 0..60 {
            memory.append(InteractionRecord::new(format!("question {}", i % 20), "answer"));
        }

        let outcome = memory.consolidate();

        assert_eq!(outcome.episodes_trimmed, 0);
        assert_eq!(memory.episodic().len(), 60);
        assert_eq!(outcome.patterns_written, 20);
    }

    #[test]
    fn test_retained_episodes_are_not_counted_twice() {
        let mut memory = AgentMemory::new(limits(10, 4));
        for _ in 0..5 {
            memory.append(InteractionRecord::new("ping", "pong"));
        }
        memory.consolidate();
        assert_eq!(memory.recall("ping").unwrap().occurrences, 5);

        // Two episodes survive the first pass and are seen again here.
        memory.consolidate();
        assert_eq!(memory.episodic().len(), 2);
        assert_eq!(memory.recall("ping").unwrap().occurrences, 2);
    }

    #[test]
    fn test_semantic_tier_never_shrinks() {
        let mut memory = AgentMemory::new(limits(10, 4));
        for _ in 0..5 {
            memory.append(InteractionRecord::new("ping", "pong"));
        }
        memory.consolidate();
        let before = memory.semantic().len();

        for i in 0..5 {
            memory.append(InteractionRecord::new(format!("unique {}", i), "x"));
        }
        memory.consolidate();

        assert!(memory.semantic().len() >= before);
        assert!(memory.recall("ping").is_some());
    }

    #[test]
    fn test_bind_skill_overwrites() {
        let mut memory = AgentMemory::new(MemoryLimits::default());
        let id = SkillId::new("search");
        memory.bind_skill(SkillBinding::new(
            id.clone(),
            "Search",
            SkillTrigger::Command { name: "search".into() },
        ));
        let previous = memory.bind_skill(SkillBinding::new(
            id.clone(),
            "Web Search",
            SkillTrigger::Endpoint { url: "http://localhost:9000/search".into() },
        ));

        assert_eq!(previous.unwrap().name, "Search");
        assert_eq!(memory.skill(&id).unwrap().name, "Web Search");
        assert_eq!(memory.skills().count(), 1);
    }

    #[test]
    fn test_restore_applies_current_working_capacity() {
        let mut memory = AgentMemory::new(limits(5, 100));
        for i in 0..5 {
            memory.append(InteractionRecord::new(format!("{}", i), "r"));
        }

        let restored = AgentMemory::restore(memory.snapshot(), limits(2, 100));
        let perceptions: Vec<_> = restored.working().map(|e| e.perception.as_str()).collect();
        assert_eq!(perceptions, vec!["3", "4"]);
        assert_eq!(restored.episodic().len(), 5);
    }
}
