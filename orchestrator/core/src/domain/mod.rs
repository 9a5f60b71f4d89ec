// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure domain types and collaborator contracts. No I/O.

pub mod agent;
pub mod config;
pub mod events;
pub mod inference;
pub mod market;
pub mod sandbox;
pub mod skill;
pub mod storage;
pub mod task;
pub mod transport;
