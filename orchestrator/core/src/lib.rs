// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-core`: Domain Kernel of the Hive Agent Runtime
//!
//! Shared vocabulary for every other crate in the workspace: agent identity and
//! lifecycle states, tasks and sub-tasks, market types, domain events, and the
//! narrow ports through which the runtime talks to its external collaborators
//! (durable storage, inference, sandboxed execution, transport).
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent`, `Task`, `SubTask`, `Bid`, `Allocation`, events, config manifest, collaborator traits |
//! | [`infrastructure`] | Infrastructure | `EventBus`, durable store adapters, logging bootstrap |

pub mod domain;
pub mod infrastructure;

pub use domain::*;
