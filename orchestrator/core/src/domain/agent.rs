// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Aggregate
//!
//! Identity, capability set and lifecycle state of a runtime agent.
//!
//! ## Lifecycle State Machine
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | `Active` | `Hibernating` | `hibernate` (explicit or channel closed) |
//! | `Hibernating` | `Active` | `wake` |
//! | `Active` | `Terminated` | `terminate` |
//!
//! `Terminated` is terminal. Every other pair is rejected with
//! [`TransitionError`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Reputation assigned to an agent the directory has never scored.
pub const INITIAL_REPUTATION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token identifying one hibernation session of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionMarker(pub Uuid);

impl SessionMarker {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability name → proficiency in `[0, 1]`.
///
/// Ordered so that serialized snapshots of the same set are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeMap<String, f64>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, capability: impl Into<String>, proficiency: f64) -> Self {
        self.0.insert(capability.into(), proficiency);
        self
    }

    pub fn insert(&mut self, capability: impl Into<String>, proficiency: f64) -> Option<f64> {
        self.0.insert(capability.into(), proficiency)
    }

    pub fn proficiency(&self, capability: &str) -> Option<f64> {
        self.0.get(capability).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Hibernating,
    Terminated,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (LifecycleState::Active, LifecycleState::Hibernating)
                | (LifecycleState::Hibernating, LifecycleState::Active)
                | (LifecycleState::Active, LifecycleState::Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Terminated
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Active => write!(f, "Active"),
            LifecycleState::Hibernating => write!(f, "Hibernating"),
            LifecycleState::Terminated => write!(f, "Terminated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid lifecycle transition from {from} to {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Aggregate root for a runtime agent.
///
/// The `capabilities` and `reputation` fields are the values last recorded
/// for persistence; the live, authoritative copies are held by the capability
/// directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub capabilities: CapabilitySet,
    pub reputation: f64,
    pub state: LifecycleState,
    /// User-facing preferences restored on wake.
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>, capabilities: CapabilitySet) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            name: name.into(),
            capabilities,
            reputation: INITIAL_REPUTATION,
            state: LifecycleState::Active,
            preferences: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_preference(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.preferences.insert(key.into(), value.into());
        self
    }

    pub fn transition(&mut self, next: LifecycleState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_starts_active_with_initial_reputation() {
        let agent = Agent::new("scout", CapabilitySet::new().with("search", 0.9));

        assert_eq!(agent.state, LifecycleState::Active);
        assert_eq!(agent.reputation, INITIAL_REPUTATION);
        assert_eq!(agent.capabilities.proficiency("search"), Some(0.9));
        assert_eq!(agent.capabilities.proficiency("code"), None);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut agent = Agent::new("worker", CapabilitySet::new());

        assert!(agent.transition(LifecycleState::Hibernating).is_ok());
        assert!(agent.transition(LifecycleState::Active).is_ok());
        assert!(agent.transition(LifecycleState::Terminated).is_ok());

        let err = agent.transition(LifecycleState::Active).unwrap_err();
        assert_eq!(err.from, LifecycleState::Terminated);
        assert_eq!(err.to, LifecycleState::Active);
    }

    #[test]
    fn test_hibernating_agent_cannot_be_terminated_directly() {
        let mut agent = Agent::new("sleeper", CapabilitySet::new());
        agent.transition(LifecycleState::Hibernating).unwrap();

        assert!(agent.transition(LifecycleState::Terminated).is_err());
        assert!(agent.transition(LifecycleState::Hibernating).is_err());
        assert_eq!(agent.state, LifecycleState::Hibernating);
    }
}
