// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prompt Assembly
//!
//! Renders the prompt handed to the inference collaborator from an agent's
//! memory tiers, using Handlebars.
//!
//! # Supported Placeholders
//!
//! - `{{agent_name}}` - Name of the responding agent
//! - `{{input}}` - The inbound chat text
//! - `{{#each semantic}}` - Relevant semantic entries (`key`, `value`)
//! - `{{#each skills}}` - Bound skills (`id`, `name`)
//! - `{{#each working}}` - Working window, oldest first (`perception`, `response`)

use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::memory::{AgentMemory, WorkingEntry};
use crate::domain::pattern::pattern_key;

const TEMPLATE_NAME: &str = "prompt";

/// Semantic entries included per prompt.
const MAX_SEMANTIC_ENTRIES: usize = 8;

pub const DEFAULT_TEMPLATE: &str = "You are {{agent_name}}.
{{#if semantic}}
Known facts:
{{#each semantic}}- {{key}}: {{value}}
{{/each}}{{/if}}{{#if skills}}
Available skills:
{{#each skills}}- {{id}} ({{name}})
{{/each}}{{/if}}{{#if working}}
Recent conversation:
{{#each working}}User: {{perception}}
{{../agent_name}}: {{response}}
{{/each}}{{/if}}
User: {{input}}
{{agent_name}}:";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid prompt template: {0}")]
    Template(String),

    #[error("Failed to render prompt: {0}")]
    Render(String),
}

#[derive(Debug, Serialize)]
struct SemanticLine {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SkillLine {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    agent_name: &'a str,
    input: &'a str,
    semantic: Vec<SemanticLine>,
    skills: Vec<SkillLine>,
    working: Vec<&'a WorkingEntry>,
}

pub struct PromptAssembler {
    handlebars: Handlebars<'static>,
}

impl PromptAssembler {
    /// Compile `template`, or [`DEFAULT_TEMPLATE`] when `None`.
    pub fn new(template: Option<&str>) -> Result<Self, PromptError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, template.unwrap_or(DEFAULT_TEMPLATE))
            .map_err(|e| PromptError::Template(e.to_string()))?;

        Ok(Self { handlebars })
    }

    pub fn assemble(
        &self,
        agent_name: &str,
        input: &str,
        memory: &AgentMemory,
    ) -> Result<String, PromptError> {
        let context = PromptContext {
            agent_name,
            input,
            semantic: relevant_semantic(input, memory),
            skills: memory
                .skills()
                .map(|b| SkillLine {
                    id: b.skill_id.to_string(),
                    name: b.name.clone(),
                })
                .collect(),
            working: memory.working().collect(),
        };

        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| PromptError::Render(e.to_string()))
    }
}

/// Exact pattern match first, then entries sharing the most words with the
/// input. Entries sharing nothing are left out.
fn relevant_semantic(input: &str, memory: &AgentMemory) -> Vec<SemanticLine> {
    let key = pattern_key(input);
    let words: BTreeSet<&str> = key.split(' ').filter(|w| !w.is_empty()).collect();

    let mut scored: Vec<(usize, &String, &String)> = memory
        .semantic()
        .iter()
        .filter_map(|(k, v)| {
            let score = if *k == key {
                usize::MAX
            } else {
                k.split(' ').filter(|w| words.contains(w)).count()
            };
            (score > 0).then_some((score, k, &v.value))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SEMANTIC_ENTRIES)
        .map(|(_, k, v)| SemanticLine {
            key: k.clone(),
            value: v.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{InteractionRecord, MemoryLimits};
    use hive_core::skill::{SkillBinding, SkillId, SkillTrigger};

    fn memory_with_facts() -> AgentMemory {
        let mut memory = AgentMemory::new(MemoryLimits {
            working_capacity: 1,
            ..MemoryLimits::default()
        });
        for _ in 0..2 {
            memory.append(InteractionRecord::new("favourite colour", "teal"));
            memory.append(InteractionRecord::new("home town", "Lisbon"));
        }
        memory.consolidate();
        memory.append(InteractionRecord::new("good morning", "morning!"));
        memory.bind_skill(SkillBinding::new(
            SkillId::new("weather"),
            "Weather lookup",
            SkillTrigger::Endpoint { url: "http://weather.local".into() },
        ));
        memory
    }

    #[test]
    fn test_default_template_includes_tiers() {
        let assembler = PromptAssembler::new(None).unwrap();
        let prompt = assembler
            .assemble("Ada", "what is my favourite colour?", &memory_with_facts())
            .unwrap();

        assert!(prompt.starts_with("You are Ada."));
        assert!(prompt.contains("- favourite colour: teal"));
        assert!(!prompt.contains("Lisbon"));
        assert!(prompt.contains("- weather (Weather lookup)"));
        assert!(prompt.contains("User: good morning\nAda: morning!"));
        assert!(prompt.ends_with("User: what is my favourite colour?\nAda:"));
    }

    #[test]
    fn test_custom_template() {
        let assembler = PromptAssembler::new(Some("{{input}} <{{agent_name}}>")).unwrap();
        let prompt = assembler
            .assemble("Ada", "a < b & c", &AgentMemory::new(MemoryLimits::default()))
            .unwrap();

        assert_eq!(prompt, "a < b & c <Ada>");
    }

    #[test]
    fn test_invalid_template_rejected() {
        assert!(matches!(
            PromptAssembler::new(Some("{{#if input}}unclosed")),
            Err(PromptError::Template(_))
        ));
    }
}
