// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Memory Snapshots
//!
//! Durable form of all four memory tiers. Tiers are serialized as JSON with
//! ordered maps so that serializing the same memory twice yields identical
//! bytes.
//!
//! Decoding is strict: each tier must be present and well-typed, otherwise
//! [`MemoryError::CorruptSnapshot`] names the offending tier.

use hive_core::agent::{Agent, SessionMarker};
use hive_core::skill::{SkillBinding, SkillId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::memory::{InteractionRecord, SemanticValue, WorkingEntry};
use crate::domain::MemoryError;

pub const TIERS: [&str; 4] = ["working", "episodic", "semantic", "procedural"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub working: Vec<WorkingEntry>,
    pub episodic: Vec<InteractionRecord>,
    pub semantic: BTreeMap<String, SemanticValue>,
    pub procedural: BTreeMap<SkillId, SkillBinding>,
}

impl MemorySnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MemoryError> {
        serde_json::to_vec(self).map_err(|e| MemoryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MemoryError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| MemoryError::CorruptSnapshot(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate tier by tier so the error names what is missing or malformed.
    pub fn from_value(value: Value) -> Result<Self, MemoryError> {
        let Value::Object(mut tiers) = value else {
            return Err(MemoryError::CorruptSnapshot(
                "snapshot is not an object".to_string(),
            ));
        };

        let mut take = |tier: &str| {
            tiers
                .remove(tier)
                .ok_or_else(|| MemoryError::CorruptSnapshot(format!("missing tier '{}'", tier)))
        };
        let working = take("working")?;
        let episodic = take("episodic")?;
        let semantic = take("semantic")?;
        let procedural = take("procedural")?;

        Ok(Self {
            working: decode_tier("working", working)?,
            episodic: decode_tier("episodic", episodic)?,
            semantic: decode_tier("semantic", semantic)?,
            procedural: decode_tier("procedural", procedural)?,
        })
    }
}

fn decode_tier<T: serde::de::DeserializeOwned>(tier: &str, value: Value) -> Result<T, MemoryError> {
    serde_json::from_value(value)
        .map_err(|e| MemoryError::CorruptSnapshot(format!("malformed tier '{}': {}", tier, e)))
}

/// What `hibernate` persists under `StorageKey::AgentSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HibernationRecord {
    pub session: SessionMarker,
    /// Identity, capabilities and preferences as of hibernation.
    pub agent: Agent,
    pub memory: MemorySnapshot,
    pub hibernated_at: DateTime<Utc>,
}

impl HibernationRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MemoryError> {
        serde_json::to_vec(self).map_err(|e| MemoryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MemoryError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| MemoryError::CorruptSnapshot(format!("not valid JSON: {}", e)))?;
        let Value::Object(mut record) = value else {
            return Err(MemoryError::CorruptSnapshot(
                "hibernation record is not an object".to_string(),
            ));
        };

        let memory = record
            .remove("memory")
            .ok_or_else(|| MemoryError::CorruptSnapshot("missing memory".to_string()))?;
        let memory = MemorySnapshot::from_value(memory)?;

        let mut field = |name: &str| {
            record
                .remove(name)
                .ok_or_else(|| MemoryError::CorruptSnapshot(format!("missing field '{}'", name)))
        };
        let session = field("session")?;
        let agent = field("agent")?;
        let hibernated_at = field("hibernated_at")?;

        Ok(Self {
            session: decode_tier("session", session)?,
            agent: decode_tier("agent", agent)?,
            memory,
            hibernated_at: decode_tier("hibernated_at", hibernated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{AgentMemory, MemoryLimits};
    use hive_core::agent::CapabilitySet;
    use hive_core::skill::SkillTrigger;

    fn populated_memory() -> AgentMemory {
        let mut memory = AgentMemory::new(MemoryLimits::default());
        for i in 0..4 {
            memory.append(InteractionRecord::new("status?", format!("green {}", i)));
        }
        memory.consolidate();
        memory.bind_skill(SkillBinding::new(
            SkillId::new("deploy"),
            "Deploy",
            SkillTrigger::Event { topic: "deploys".into() },
        ));
        memory
    }

    #[test]
    fn test_snapshot_bytes_are_stable() {
        let memory = populated_memory();
        let first = memory.snapshot().to_bytes().unwrap();
        let decoded = MemorySnapshot::from_bytes(&first).unwrap();

        assert_eq!(decoded, memory.snapshot());
        assert_eq!(decoded.to_bytes().unwrap(), first);
    }

    #[test]
    fn test_missing_tier_is_corrupt() {
        let mut value = serde_json::to_value(populated_memory().snapshot()).unwrap();
        value.as_object_mut().unwrap().remove("procedural");

        let err = MemorySnapshot::from_value(value).unwrap_err();
        match err {
            MemoryError::CorruptSnapshot(msg) => assert!(msg.contains("procedural")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_tier_is_corrupt() {
        let mut value = serde_json::to_value(populated_memory().snapshot()).unwrap();
        value["working"] = serde_json::json!("not a list");

        assert!(matches!(
            MemorySnapshot::from_value(value),
            Err(MemoryError::CorruptSnapshot(_))
        ));
        assert!(matches!(
            MemorySnapshot::from_bytes(b"{truncated"),
            Err(MemoryError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_hibernation_record_decodes() {
        let record = HibernationRecord {
            session: SessionMarker::new(),
            agent: Agent::new("scout", CapabilitySet::new().with("search", 0.9)),
            memory: populated_memory().snapshot(),
            hibernated_at: Utc::now(),
        };

        let decoded = HibernationRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.session, record.session);
        assert_eq!(decoded.agent, record.agent);
        assert_eq!(decoded.memory, record.memory);
    }
}
