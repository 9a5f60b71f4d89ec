// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capability Directory
//!
//! Who can do what, and how far they can be trusted.
//!
//! ## Match Score
//!
//! `Σ(importance × proficiency) / Σ(importance)` over the required
//! capabilities; a capability the agent lacks contributes 0. Only agents
//! scoring strictly above `match_threshold` are returned, best first, ties
//! broken by agent id.
//!
//! ## Reputation
//!
//! Exponential moving average of outcomes:
//! `score = score·(1−α) + success·α`. Unknown agents start at
//! `initial_reputation`.
//!
//! ## Autonomy
//!
//! | Reputation | Grant |
//! |------------|-------|
//! | `> full_autonomy_threshold` | `Full` |
//! | `> limited_autonomy_threshold` | `Limited` (external approval) |
//! | otherwise | `Denied` (mediation) |
//!
//! The configured [`DiscoveryMode`] caps the grant.
//!
//! Each profile has its own lock; there is no directory-wide lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hive_core::agent::{AgentId, CapabilitySet};
use hive_core::config::{DirectoryConfig, DiscoveryMode};
use hive_core::task::CapabilityRequirement;
use hive_cortex::application::ReputationSource;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Agent {0} is not registered")]
    UnknownAgent(AgentId),

    #[error("Reputation of agent {agent_id} would leave [0, 1]: {value}")]
    ReputationUnderflow { agent_id: AgentId, value: f64 },

    #[error("Proficiency {proficiency} for '{capability}' is outside [0, 1]")]
    InvalidProficiency { capability: String, proficiency: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub agent_id: AgentId,
    pub capabilities: CapabilitySet,
    pub reputation: f64,
    pub successes: u64,
    pub failures: u64,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateMatch {
    pub agent_id: AgentId,
    pub score: f64,
    pub reputation: f64,
}

/// Ordered from least to most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyGrant {
    /// Mediation required; the agent may not act on its own.
    Denied,
    /// The agent may act once an external approver agrees.
    Limited,
    Full,
}

impl AutonomyGrant {
    pub fn requires_approval(self) -> bool {
        self == AutonomyGrant::Limited
    }
}

/// Weighted capability match in `[0, 1]`. No requirements matches anyone.
pub fn match_score(requirements: &[CapabilityRequirement], capabilities: &CapabilitySet) -> f64 {
    let weighted: Vec<_> = requirements
        .iter()
        .filter(|r| r.importance.is_finite() && r.importance > 0.0)
        .collect();
    if weighted.is_empty() {
        return 1.0;
    }

    let total: f64 = weighted.iter().map(|r| r.importance).sum();
    let earned: f64 = weighted
        .iter()
        .map(|r| r.importance * capabilities.proficiency(&r.capability).unwrap_or(0.0))
        .sum();
    (earned / total).clamp(0.0, 1.0)
}

pub struct CapabilityDirectory {
    profiles: DashMap<AgentId, Arc<Mutex<Profile>>>,
    config: DirectoryConfig,
}

impl CapabilityDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            profiles: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn profile_handle(&self, agent_id: AgentId) -> Option<Arc<Mutex<Profile>>> {
        self.profiles.get(&agent_id).map(|e| Arc::clone(e.value()))
    }

    /// Register or refresh an agent's capabilities. A known agent keeps its
    /// reputation.
    pub fn register(&self, agent_id: AgentId, capabilities: CapabilitySet) -> Result<(), DirectoryError> {
        self.register_with_reputation(agent_id, capabilities, None)
    }

    /// Register with a reputation carried over from a previous session.
    pub fn register_with_reputation(
        &self,
        agent_id: AgentId,
        capabilities: CapabilitySet,
        reputation: Option<f64>,
    ) -> Result<(), DirectoryError> {
        for (capability, proficiency) in capabilities.iter() {
            if !(0.0..=1.0).contains(proficiency) {
                return Err(DirectoryError::InvalidProficiency {
                    capability: capability.clone(),
                    proficiency: *proficiency,
                });
            }
        }
        if let Some(value) = reputation {
            if !(0.0..=1.0).contains(&value) {
                return Err(DirectoryError::ReputationUnderflow { agent_id, value });
            }
        }

        let now = Utc::now();
        if let Some(handle) = self.profile_handle(agent_id) {
            let mut profile = handle.lock();
            profile.capabilities = capabilities;
            if let Some(value) = reputation {
                profile.reputation = value;
            }
            profile.updated_at = now;
            debug!(agent_id = %agent_id, "Refreshed capability profile");
            return Ok(());
        }

        let reputation = reputation.unwrap_or(self.config.initial_reputation);
        self.profiles.insert(
            agent_id,
            Arc::new(Mutex::new(Profile {
                agent_id,
                capabilities,
                reputation,
                successes: 0,
                failures: 0,
                registered_at: now,
                updated_at: now,
            })),
        );
        info!(agent_id = %agent_id, reputation, "Agent added to capability directory");
        Ok(())
    }

    pub fn deregister(&self, agent_id: AgentId) -> bool {
        self.profiles.remove(&agent_id).is_some()
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.profiles.contains_key(&agent_id)
    }

    pub fn profile(&self, agent_id: AgentId) -> Option<Profile> {
        self.profile_handle(agent_id).map(|h| h.lock().clone())
    }

    /// Agents scoring above the match threshold, best first.
    pub fn find(&self, requirements: &[CapabilityRequirement]) -> Vec<CandidateMatch> {
        let handles: Vec<_> = self.profiles.iter().map(|e| Arc::clone(e.value())).collect();

        let mut matches: Vec<CandidateMatch> = handles
            .iter()
            .filter_map(|handle| {
                let profile = handle.lock();
                let score = match_score(requirements, &profile.capabilities);
                (score > self.config.match_threshold).then_some(CandidateMatch {
                    agent_id: profile.agent_id,
                    score,
                    reputation: profile.reputation,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        matches
    }

    /// Current reputation; `initial_reputation` for unknown agents.
    pub fn reputation(&self, agent_id: AgentId) -> f64 {
        self.profile_handle(agent_id)
            .map(|h| h.lock().reputation)
            .unwrap_or(self.config.initial_reputation)
    }

    /// Fold one outcome into the agent's reputation and return the new value.
    pub fn update_reputation(&self, agent_id: AgentId, success: bool) -> Result<f64, DirectoryError> {
        let handle = self
            .profile_handle(agent_id)
            .ok_or(DirectoryError::UnknownAgent(agent_id))?;
        let mut profile = handle.lock();

        let alpha = self.config.reputation_alpha;
        let outcome = if success { 1.0 } else { 0.0 };
        let next = profile.reputation * (1.0 - alpha) + outcome * alpha;
        if !next.is_finite() || next < 0.0 {
            return Err(DirectoryError::ReputationUnderflow { agent_id, value: next });
        }

        profile.reputation = next.min(1.0);
        if success {
            profile.successes += 1;
        } else {
            profile.failures += 1;
        }
        profile.updated_at = Utc::now();

        debug!(agent_id = %agent_id, success, reputation = profile.reputation, "Reputation updated");
        Ok(profile.reputation)
    }

    pub fn authorize(&self, agent_id: AgentId) -> AutonomyGrant {
        let reputation = self.reputation(agent_id);
        let earned = if reputation > self.config.full_autonomy_threshold {
            AutonomyGrant::Full
        } else if reputation > self.config.limited_autonomy_threshold {
            AutonomyGrant::Limited
        } else {
            AutonomyGrant::Denied
        };

        match self.config.discovery_mode {
            DiscoveryMode::Mediated => AutonomyGrant::Denied,
            DiscoveryMode::Limited => earned.min(AutonomyGrant::Limited),
            DiscoveryMode::Autonomous => earned,
        }
    }
}

impl ReputationSource for CapabilityDirectory {
    fn reputation(&self, agent_id: AgentId) -> Option<f64> {
        self.profile_handle(agent_id).map(|h| h.lock().reputation)
    }
}
