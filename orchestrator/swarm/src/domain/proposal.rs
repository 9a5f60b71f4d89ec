// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decomposition Proposals
//!
//! A proposal either splits a task into sub-task descriptors or argues the
//! task is atomic. Two proposals are structurally equal when they partition
//! the task's work units the same way, regardless of descriptions or order.

use hive_core::task::{CapabilityRequirement, SubTask, TaskId, TaskPayload, WorkUnit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskDescriptor {
    pub description: String,
    pub units: BTreeSet<WorkUnit>,
    #[serde(default)]
    pub requirements: Vec<CapabilityRequirement>,
    #[serde(default)]
    pub input: serde_json::Value,
}

impl SubTaskDescriptor {
    pub fn new<I, S>(description: impl Into<String>, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            units: units.into_iter().map(WorkUnit::new).collect(),
            requirements: Vec::new(),
            input: serde_json::Value::Null,
        }
    }

    pub fn with_requirement(mut self, capability: impl Into<String>, importance: f64) -> Self {
        self.requirements
            .push(CapabilityRequirement::new(capability, importance));
        self
    }

    pub fn into_sub_task(self, parent: TaskId) -> SubTask {
        SubTask::new(
            parent,
            TaskPayload {
                description: self.description,
                units: self.units,
                requirements: self.requirements,
                input: self.input,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Proposal {
    Split { sub_tasks: Vec<SubTaskDescriptor> },
    Atomic,
}

/// Canonical partition of work units; the key proposals are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionSignature {
    Atomic,
    Split(BTreeSet<BTreeSet<WorkUnit>>),
}

impl Proposal {
    pub fn signature(&self) -> PartitionSignature {
        match self {
            Proposal::Atomic => PartitionSignature::Atomic,
            Proposal::Split { sub_tasks } => {
                PartitionSignature::Split(sub_tasks.iter().map(|d| d.units.clone()).collect())
            }
        }
    }
}

/// Why a split was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("proposal contains no sub-tasks")]
    Empty,

    #[error("task has no work units to partition")]
    Indivisible,

    #[error("sub-task '{0}' claims no work units")]
    EmptySubTask(String),

    #[error("work unit '{0}' is claimed by more than one sub-task")]
    Overlap(String),

    #[error("work unit '{0}' is not part of the task")]
    Foreign(String),

    #[error("work unit '{0}' is not covered by any sub-task")]
    Uncovered(String),
}

/// Check that `sub_tasks` covers every unit of `task_units` exactly once.
pub fn validate_partition(
    task_units: &BTreeSet<WorkUnit>,
    sub_tasks: &[SubTaskDescriptor],
) -> Result<(), PartitionError> {
    if sub_tasks.is_empty() {
        return Err(PartitionError::Empty);
    }
    if task_units.is_empty() {
        return Err(PartitionError::Indivisible);
    }

    let mut claimed: BTreeSet<&WorkUnit> = BTreeSet::new();
    for descriptor in sub_tasks {
        if descriptor.units.is_empty() {
            return Err(PartitionError::EmptySubTask(descriptor.description.clone()));
        }
        for unit in &descriptor.units {
            if !task_units.contains(unit) {
                return Err(PartitionError::Foreign(unit.0.clone()));
            }
            if !claimed.insert(unit) {
                return Err(PartitionError::Overlap(unit.0.clone()));
            }
        }
    }

    if let Some(missing) = task_units.iter().find(|u| !claimed.contains(u)) {
        return Err(PartitionError::Uncovered(missing.0.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(names: &[&str]) -> BTreeSet<WorkUnit> {
        names.iter().map(|n| WorkUnit::new(*n)).collect()
    }

    #[test]
    fn test_signature_ignores_order_and_descriptions() {
        let a = Proposal::Split {
            sub_tasks: vec![
                SubTaskDescriptor::new("fetch data", ["fetch"]),
                SubTaskDescriptor::new("write it up", ["analyse", "report"]),
            ],
        };
        let b = Proposal::Split {
            sub_tasks: vec![
                SubTaskDescriptor::new("report", ["report", "analyse"]),
                SubTaskDescriptor::new("download", ["fetch"]),
            ],
        };
        let c = Proposal::Split {
            sub_tasks: vec![
                SubTaskDescriptor::new("one", ["fetch", "analyse"]),
                SubTaskDescriptor::new("two", ["report"]),
            ],
        };

        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
        assert_eq!(Proposal::Atomic.signature(), PartitionSignature::Atomic);
    }

    #[test]
    fn test_validate_partition() {
        let task = units(&["fetch", "analyse", "report"]);

        let good = vec![
            SubTaskDescriptor::new("a", ["fetch"]),
            SubTaskDescriptor::new("b", ["analyse", "report"]),
        ];
        assert!(validate_partition(&task, &good).is_ok());

        let overlapping = vec![
            SubTaskDescriptor::new("a", ["fetch", "analyse"]),
            SubTaskDescriptor::new("b", ["analyse", "report"]),
        ];
        assert_eq!(
            validate_partition(&task, &overlapping),
            Err(PartitionError::Overlap("analyse".into()))
        );

        let gap = vec![SubTaskDescriptor::new("a", ["fetch"])];
        assert!(matches!(
            validate_partition(&task, &gap),
            Err(PartitionError::Uncovered(_))
        ));

        let foreign = vec![SubTaskDescriptor::new("a", ["fetch", "analyse", "report", "deploy"])];
        assert_eq!(
            validate_partition(&task, &foreign),
            Err(PartitionError::Foreign("deploy".into()))
        );

        assert_eq!(
            validate_partition(&BTreeSet::new(), &good),
            Err(PartitionError::Indivisible)
        );
        assert_eq!(validate_partition(&task, &[]), Err(PartitionError::Empty));
    }
}
