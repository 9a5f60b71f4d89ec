// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable skill identifier chosen by the agent that binds it (e.g. `web-search`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a bound skill is reached. Invoking it is the transport's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillTrigger {
    Endpoint { url: String },
    Command { name: String },
    Event { topic: String },
}

/// Procedural-memory entry: one row of the (agent, skill) → binding relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBinding {
    pub skill_id: SkillId,
    pub name: String,
    pub trigger: SkillTrigger,
    pub bound_at: DateTime<Utc>,
}

impl SkillBinding {
    pub fn new(skill_id: SkillId, name: impl Into<String>, trigger: SkillTrigger) -> Self {
        Self {
            skill_id,
            name: name.into(),
            trigger,
            bound_at: Utc::now(),
        }
    }
}
