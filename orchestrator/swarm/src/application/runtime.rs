// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Hive Runtime
//!
//! Transport-facing facade. Wires the memory store, lifecycle manager,
//! capability directory and swarm pipeline together and turns
//! [`TransportEvent`]s into replies.
//!
//! | Inbound | Handling |
//! |---------|----------|
//! | `chat` | prompt from memory → inference (with timeout) → append → reply |
//! | `skill` | bind / lookup / list procedural memory |
//! | `memory` | recall / working window / consolidate / snapshot |
//! | `swarm` | decompose → allocate → execute → `TaskReport` |
//! | channel closed | hibernate |
//!
//! A message for a hibernating agent wakes it first. Errors never escape
//! [`HiveRuntime::handle`]; they are answered with an `error` payload.

use hive_core::agent::{Agent, AgentId, SessionMarker};
use hive_core::config::{HiveConfigManifest, HiveConfigSpec};
use hive_core::inference::{GenerationOptions, InferenceError, InferenceProvider};
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::infrastructure::storage::durable_store_from_config;
use hive_core::sandbox::SandboxExecutor;
use hive_core::skill::{SkillBinding, SkillId};
use hive_core::storage::{DurableStore, StorageError};
use hive_core::transport::{
    InboundMessage, InboundPayload, MemoryCommand, OutboundMessage, OutboundPayload, SkillCommand,
    TransportEvent,
};
use hive_cortex::application::{
    LifecycleError, LifecycleManager, MemoryStore, PromptAssembler, PromptError, ReputationSource,
};
use hive_cortex::domain::memory::{InteractionRecord, MemoryLimits};
use hive_cortex::domain::MemoryError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::allocator::MarketAllocator;
use crate::application::coordinator::ExecutionCoordinator;
use crate::application::decomposer::TaskDecomposer;
use crate::application::directory::{CapabilityDirectory, DirectoryError};
use crate::application::participants::ParticipantPool;
use crate::application::pipeline::SwarmPipeline;
use crate::domain::participant::SwarmParticipant;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Skill '{0}' is not bound")]
    SkillNotFound(SkillId),

    #[error("Failed to encode response: {0}")]
    Encoding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RuntimeError {
    /// Stable machine-readable kind for the `error` payload.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::Lifecycle(e) => match e {
                LifecycleError::AgentNotFound(_) => "agent_not_found",
                LifecycleError::AgentAlreadyActive(_) => "agent_already_active",
                LifecycleError::AgentTerminated(_) => "agent_terminated",
                LifecycleError::InvalidTransition(_) => "invalid_transition",
                LifecycleError::Memory(e) => memory_kind(e),
                LifecycleError::Storage(_) => "storage",
            },
            RuntimeError::Memory(e) => memory_kind(e),
            RuntimeError::Inference(InferenceError::Timeout(_)) => "inference_timeout",
            RuntimeError::Inference(_) => "inference_failed",
            RuntimeError::Prompt(_) => "prompt",
            RuntimeError::Directory(DirectoryError::UnknownAgent(_)) => "agent_not_found",
            RuntimeError::Directory(_) => "invalid_capabilities",
            RuntimeError::Storage(_) => "storage",
            RuntimeError::SkillNotFound(_) => "skill_not_found",
            RuntimeError::Encoding(_) => "encoding",
            RuntimeError::InvalidConfig(_) => "invalid_config",
        }
    }
}

fn memory_kind(error: &MemoryError) -> &'static str {
    match error {
        MemoryError::UnknownAgent(_) => "agent_not_found",
        MemoryError::CorruptSnapshot(_) => "corrupt_snapshot",
        MemoryError::Serialization(_) => "encoding",
        MemoryError::Storage(_) => "storage",
    }
}

pub struct HiveRuntime {
    spec: HiveConfigSpec,
    lifecycle: Arc<LifecycleManager>,
    directory: Arc<CapabilityDirectory>,
    participants: Arc<ParticipantPool>,
    pipeline: SwarmPipeline,
    prompts: PromptAssembler,
    inference: Arc<dyn InferenceProvider>,
    event_bus: EventBus,
}

impl HiveRuntime {
    pub fn new(
        spec: HiveConfigSpec,
        durable: Arc<dyn DurableStore>,
        inference: Arc<dyn InferenceProvider>,
        sandbox: Arc<dyn SandboxExecutor>,
        event_bus: EventBus,
    ) -> Result<Self, RuntimeError> {
        spec.validate()
            .map_err(|e| RuntimeError::InvalidConfig(format!("{:#}", e)))?;
        let prompts = PromptAssembler::new(spec.memory.prompt_template.as_deref())?;

        let memory = Arc::new(MemoryStore::new(
            MemoryLimits::from(&spec.memory),
            Arc::clone(&durable),
            event_bus.clone(),
        ));
        let directory = Arc::new(CapabilityDirectory::new(spec.directory.clone()));
        let lifecycle = Arc::new(
            LifecycleManager::new(memory, durable, event_bus.clone())
                .with_reputation_source(Arc::clone(&directory) as Arc<dyn ReputationSource>),
        );
        let participants = Arc::new(ParticipantPool::new());

        let allocator = Arc::new(MarketAllocator::new(
            spec.market.clone(),
            Arc::clone(&directory),
            event_bus.clone(),
        ));
        let decomposer = TaskDecomposer::new(
            spec.decomposition.clone(),
            Arc::clone(&directory),
            event_bus.clone(),
        );
        let coordinator = ExecutionCoordinator::new(
            spec.execution.clone(),
            Arc::clone(&allocator),
            Arc::clone(&directory),
            sandbox,
            event_bus.clone(),
        );
        let pipeline = SwarmPipeline::new(
            decomposer,
            allocator,
            coordinator,
            Arc::clone(&participants),
            Arc::clone(&lifecycle),
        );

        Ok(Self {
            spec,
            lifecycle,
            directory,
            participants,
            pipeline,
            prompts,
            inference,
            event_bus,
        })
    }

    /// Build a runtime from a validated manifest, using the storage backend
    /// it names.
    pub fn from_manifest(
        manifest: &HiveConfigManifest,
        inference: Arc<dyn InferenceProvider>,
        sandbox: Arc<dyn SandboxExecutor>,
    ) -> anyhow::Result<Self> {
        manifest.validate()?;
        let durable = durable_store_from_config(&manifest.spec.storage)?;
        info!(node = %manifest.metadata.name, "Starting hive runtime");
        Ok(Self::new(
            manifest.spec.clone(),
            durable,
            inference,
            sandbox,
            EventBus::with_default_capacity(),
        )?)
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn directory(&self) -> &Arc<CapabilityDirectory> {
        &self.directory
    }

    pub fn participants(&self) -> &Arc<ParticipantPool> {
        &self.participants
    }

    pub fn pipeline(&self) -> &SwarmPipeline {
        &self.pipeline
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Register a new Active agent, and its swarm handle if it takes part
    /// in coordination.
    pub fn register_agent(
        &self,
        agent: Agent,
        participant: Option<Arc<dyn SwarmParticipant>>,
    ) -> Result<AgentId, RuntimeError> {
        self.directory
            .register_with_reputation(agent.id, agent.capabilities.clone(), Some(agent.reputation))?;
        let agent_id = self.lifecycle.register(agent);
        if let Some(participant) = participant {
            self.participants.insert(participant);
        }
        Ok(agent_id)
    }

    /// Retire an agent everywhere.
    pub async fn terminate_agent(&self, agent_id: AgentId) -> Result<(), RuntimeError> {
        self.lifecycle.terminate(agent_id).await?;
        self.directory.deregister(agent_id);
        self.participants.remove(agent_id);
        Ok(())
    }

    pub async fn handle(&self, event: TransportEvent) -> Option<OutboundMessage> {
        match event {
            TransportEvent::Message(message) => {
                let channel_id = message.channel_id.clone();
                let agent_id = message.agent_id;
                let kind = message.payload.kind();

                let payload = match self.dispatch(message).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(agent_id = %agent_id, kind, "Request failed: {}", e);
                        OutboundPayload::Error {
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                        }
                    }
                };
                Some(OutboundMessage::new(channel_id, agent_id, payload))
            }
            TransportEvent::ChannelClosed { channel_id, agent_id } => {
                debug!(agent_id = %agent_id, channel_id = %channel_id.0, "Channel closed");
                if let Err(e) = self.close_channel(agent_id).await {
                    warn!(agent_id = %agent_id, "Failed to hibernate on channel close: {}", e);
                }
                None
            }
        }
    }

    /// Hibernate an Active agent whose channel went away.
    pub async fn close_channel(&self, agent_id: AgentId) -> Result<Option<SessionMarker>, RuntimeError> {
        Ok(self.lifecycle.on_channel_closed(agent_id).await?)
    }

    pub async fn dispatch(&self, message: InboundMessage) -> Result<OutboundPayload, RuntimeError> {
        let agent = self.lifecycle.resume(message.agent_id).await?;
        if !self.directory.contains(agent.id) {
            // Woken from a snapshot written by another process.
            self.directory.register_with_reputation(
                agent.id,
                agent.capabilities.clone(),
                Some(agent.reputation),
            )?;
        }
        debug!(agent_id = %agent.id, kind = message.payload.kind(), "Dispatching message");

        match message.payload {
            InboundPayload::Chat { text } => self.chat(&agent, &text).await,
            InboundPayload::Skill { command } => self.skill(agent.id, command).await,
            InboundPayload::Memory { command } => self.memory(agent.id, command).await,
            InboundPayload::Swarm { task } => {
                let report = self.pipeline.run(task).await;
                Ok(OutboundPayload::Swarm { report })
            }
        }
    }

    async fn chat(&self, agent: &Agent, text: &str) -> Result<OutboundPayload, RuntimeError> {
        let memory = self.lifecycle.memory();
        let prompt = {
            let guard = memory.lock(agent.id).await?;
            self.prompts.assemble(&agent.name, text, &guard)?
        };

        let limit = self.spec.inference.timeout;
        let response = tokio::time::timeout(
            limit,
            self.inference.generate(&prompt, &GenerationOptions::default()),
        )
        .await
        .map_err(|_| InferenceError::Timeout(limit))??;

        if let Some(report) = memory
            .append(agent.id, InteractionRecord::new(text, response.text.clone()))
            .await?
        {
            debug!(agent_id = %agent.id, patterns = report.patterns_written, "Chat triggered consolidation");
        }
        Ok(OutboundPayload::Chat { text: response.text })
    }

    async fn skill(&self, agent_id: AgentId, command: SkillCommand) -> Result<OutboundPayload, RuntimeError> {
        let memory = self.lifecycle.memory();
        let bindings = match command {
            SkillCommand::Bind { skill_id, name, trigger } => {
                let binding = SkillBinding::new(skill_id, name, trigger);
                memory.bind_skill(agent_id, binding.clone()).await?;
                vec![binding]
            }
            SkillCommand::Lookup { skill_id } => match memory.skill(agent_id, &skill_id).await? {
                Some(binding) => vec![binding],
                None => return Err(RuntimeError::SkillNotFound(skill_id)),
            },
            SkillCommand::List => memory.skills(agent_id).await?,
        };
        Ok(OutboundPayload::Skill { bindings })
    }

    async fn memory(&self, agent_id: AgentId, command: MemoryCommand) -> Result<OutboundPayload, RuntimeError> {
        let memory = self.lifecycle.memory();
        let body = match command {
            MemoryCommand::Recall { key } => {
                let value = memory.recall(agent_id, &key).await?;
                encode(&serde_json::json!({ "key": key, "value": value }))?
            }
            MemoryCommand::Working => encode(&memory.working(agent_id).await?)?,
            MemoryCommand::Consolidate => encode(&memory.consolidate(agent_id).await?)?,
            MemoryCommand::Snapshot => encode(&memory.serialize(agent_id).await?)?,
        };
        Ok(OutboundPayload::Memory { body })
    }
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, RuntimeError> {
    serde_json::to_value(value).map_err(|e| RuntimeError::Encoding(e.to_string()))
}
