// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Market Allocator
//!
//! One sealed-bid round per sub-task. Candidates are asked for a bid only if
//! they are capable of the sub-task (directory match), trusted enough
//! (reputation above `min_bidder_reputation`), not cooling down after a
//! stall or failure, and not explicitly excluded by the caller.
//!
//! The winner maximizes `(confidence × reputation) / cost`; equal scores go
//! to the lower agent id. Bids that cannot be scored are dropped and counted.
//!
//! Sub-tasks are allocated independently of each other, so one agent may win
//! several sub-tasks of the same task.

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use hive_core::agent::AgentId;
use hive_core::config::MarketConfig;
use hive_core::events::CoordinationEvent;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::market::{Allocation, Bid, BidError};
use hive_core::task::{FailureKind, SubTask, SubTaskId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::application::directory::CapabilityDirectory;
use crate::domain::participant::SwarmParticipant;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("No capable agent bid on sub-task {sub_task_id} ({solicited} solicited)")]
    NoCapableAgent { sub_task_id: SubTaskId, solicited: usize },

    #[error("Every bid on sub-task {sub_task_id} was rejected ({rejected} rejected)")]
    AllBidsRejected { sub_task_id: SubTaskId, rejected: usize },
}

impl AllocationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AllocationError::NoCapableAgent { .. } => FailureKind::NoCapableAgent,
            AllocationError::AllBidsRejected { .. } => FailureKind::InvalidBid,
        }
    }
}

pub struct MarketAllocator {
    config: MarketConfig,
    directory: Arc<CapabilityDirectory>,
    cooldowns: DashMap<AgentId, Instant>,
    event_bus: EventBus,
}

impl MarketAllocator {
    pub fn new(config: MarketConfig, directory: Arc<CapabilityDirectory>, event_bus: EventBus) -> Self {
        Self {
            config,
            directory,
            cooldowns: DashMap::new(),
            event_bus,
        }
    }

    /// Keep `agent_id` out of every round for `period`.
    pub fn cool_down(&self, agent_id: AgentId, period: Duration) {
        let until = Instant::now() + period;
        self.cooldowns.insert(agent_id, until);
        debug!(agent_id = %agent_id, cooldown_ms = period.as_millis() as u64, "Agent cooling down");
    }

    pub fn is_cooling_down(&self, agent_id: AgentId) -> bool {
        let expired = match self.cooldowns.get(&agent_id) {
            Some(until) => *until <= Instant::now(),
            None => return false,
        };
        if expired {
            self.cooldowns.remove(&agent_id);
        }
        !expired
    }

    /// First-round allocation of every sub-task, run concurrently.
    /// Results are in the order of `sub_tasks`.
    pub async fn allocate(
        &self,
        sub_tasks: &[SubTask],
        candidates: &[Arc<dyn SwarmParticipant>],
    ) -> Vec<Result<Allocation, AllocationError>> {
        let now = Instant::now();
        self.cooldowns.retain(|_, until| *until > now);

        let no_exclusions = BTreeSet::new();
        let rounds = sub_tasks
            .iter()
            .map(|sub_task| self.allocate_one(sub_task, candidates, &no_exclusions, 0));
        let results = join_all(rounds).await;

        let mut wins: BTreeMap<AgentId, usize> = BTreeMap::new();
        for allocation in results.iter().flatten() {
            *wins.entry(allocation.agent_id).or_default() += 1;
        }
        for (agent_id, count) in wins.into_iter().filter(|(_, c)| *c > 1) {
            info!(agent_id = %agent_id, sub_tasks = count, "Agent won several sub-tasks of one task");
        }
        results
    }

    /// Run one bidding round for `sub_task`.
    pub async fn allocate_one(
        &self,
        sub_task: &SubTask,
        candidates: &[Arc<dyn SwarmParticipant>],
        excluded: &BTreeSet<AgentId>,
        round: u32,
    ) -> Result<Allocation, AllocationError> {
        let capable: BTreeSet<AgentId> = self
            .directory
            .find(&sub_task.payload.requirements)
            .into_iter()
            .filter(|m| m.reputation > self.config.min_bidder_reputation)
            .map(|m| m.agent_id)
            .collect();

        let bidders: Vec<&Arc<dyn SwarmParticipant>> = candidates
            .iter()
            .filter(|p| {
                let id = p.agent_id();
                capable.contains(&id) && !excluded.contains(&id) && !self.is_cooling_down(id)
            })
            .collect();

        debug!(
            sub_task_id = %sub_task.id,
            round,
            bidders = bidders.len(),
            "Soliciting bids"
        );

        let solicitations = bidders.iter().map(|participant| {
            let agent_id = participant.agent_id();
            async move {
                match timeout(self.config.bid_timeout, participant.solicit_bid(sub_task)).await {
                    Ok(bid) => bid.map(|bid| (agent_id, bid)),
                    Err(_) => {
                        debug!(agent_id = %agent_id, sub_task_id = %sub_task.id, "Bid deadline expired");
                        None
                    }
                }
            }
        });
        let offers: Vec<(AgentId, Bid)> = join_all(solicitations).await.into_iter().flatten().collect();

        let received = offers.len();
        let mut best: Option<(f64, Bid, f64)> = None;
        let mut rejected = 0;

        for (solicited_agent, bid) in offers {
            if let Err(e) = check_bid(&bid, sub_task.id, solicited_agent) {
                rejected += 1;
                metrics::counter!("hive_bids_rejected_total").increment(1);
                warn!(sub_task_id = %sub_task.id, "Rejected bid: {}", e);
                continue;
            }

            let reputation = self.directory.reputation(bid.agent_id);
            let score = bid.score(reputation);
            let better = match &best {
                None => true,
                Some((best_score, best_bid, _)) => {
                    score > *best_score || (score == *best_score && bid.agent_id < best_bid.agent_id)
                }
            };
            if better {
                best = Some((score, bid, reputation));
            }
        }

        let Some((score, bid, reputation)) = best else {
            return Err(if received == 0 {
                AllocationError::NoCapableAgent {
                    sub_task_id: sub_task.id,
                    solicited: bidders.len(),
                }
            } else {
                AllocationError::AllBidsRejected {
                    sub_task_id: sub_task.id,
                    rejected,
                }
            });
        };

        let allocation = Allocation::from_bid(&bid, reputation, round);
        info!(
            sub_task_id = %sub_task.id,
            agent_id = %allocation.agent_id,
            score,
            round,
            "Sub-task allocated"
        );
        self.event_bus
            .publish_coordination_event(CoordinationEvent::SubTaskAllocated {
                task_id: sub_task.parent,
                sub_task_id: sub_task.id,
                agent_id: allocation.agent_id,
                score,
                round,
                allocated_at: Utc::now(),
            });

        Ok(allocation)
    }
}

/// A bid must be scorable and must be the solicited agent's own offer for
/// this sub-task.
fn check_bid(bid: &Bid, sub_task_id: SubTaskId, solicited: AgentId) -> Result<(), BidError> {
    if bid.agent_id != solicited {
        return Err(BidError::InvalidBid {
            agent_id: solicited,
            reason: format!("bid names agent {}", bid.agent_id),
        });
    }
    if bid.sub_task_id != sub_task_id {
        return Err(BidError::InvalidBid {
            agent_id: solicited,
            reason: format!("bid is for sub-task {}", bid.sub_task_id),
        });
    }
    bid.validate()
}
