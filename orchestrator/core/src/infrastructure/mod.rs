// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Layer
//!
//! Adapters behind the domain ports.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`event_bus`] | tokio broadcast pub/sub for domain events |
//! | [`storage`] | `DurableStore` adapters (in-memory, local filesystem) |
//! | [`telemetry`] | `tracing-subscriber` bootstrap |

pub mod event_bus;
pub mod storage;
pub mod telemetry;
