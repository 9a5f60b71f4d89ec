// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Transport Boundary Types
//!
//! What the transport collaborator hands to the runtime and what it carries
//! back. Framing, sockets and authentication stay on the other side of this
//! boundary.
//!
//! Inbound messages are tagged by kind: `chat`, `skill`, `memory`, `swarm`.
//! A closed channel arrives as [`TransportEvent::ChannelClosed`] and is the
//! only externally triggered lifecycle transition (automatic hibernate).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::skill::{SkillBinding, SkillId, SkillTrigger};
use crate::domain::task::{Task, TaskReport};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportEvent {
    Message(InboundMessage),
    ChannelClosed {
        channel_id: ChannelId,
        agent_id: AgentId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: ChannelId,
    pub agent_id: AgentId,
    pub payload: InboundPayload,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(channel_id: ChannelId, agent_id: AgentId, payload: InboundPayload) -> Self {
        Self {
            channel_id,
            agent_id,
            payload,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundPayload {
    Chat { text: String },
    Skill { command: SkillCommand },
    Memory { command: MemoryCommand },
    Swarm { task: Task },
}

impl InboundPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundPayload::Chat { .. } => "chat",
            InboundPayload::Skill { .. } => "skill",
            InboundPayload::Memory { .. } => "memory",
            InboundPayload::Swarm { .. } => "swarm",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SkillCommand {
    Bind {
        skill_id: SkillId,
        name: String,
        trigger: SkillTrigger,
    },
    Lookup {
        skill_id: SkillId,
    },
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MemoryCommand {
    /// Look up one semantic entry by pattern key.
    Recall { key: String },
    /// Current working-memory window.
    Working,
    /// Force a consolidation pass.
    Consolidate,
    /// Full four-tier snapshot.
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel_id: ChannelId,
    pub agent_id: AgentId,
    pub payload: OutboundPayload,
    pub sent_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(channel_id: ChannelId, agent_id: AgentId, payload: OutboundPayload) -> Self {
        Self {
            channel_id,
            agent_id,
            payload,
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundPayload {
    Chat { text: String },
    Skill { bindings: Vec<SkillBinding> },
    Memory { body: serde_json::Value },
    Swarm { report: TaskReport },
    Error { kind: String, message: String },
}
