// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-cortex`: Agent Memory and Lifecycle
//!
//! Per-agent tiered memory (working, episodic, semantic, procedural), the
//! consolidation pass that promotes recurring episodes into semantic memory,
//! prompt assembly from those tiers, and the hibernate/wake state machine that
//! moves an agent's memory to and from durable storage.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Depends on:** `hive-core` for agent identity, storage port and events

pub mod domain;
pub mod application;

pub use domain::*;
