// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Market Types
//!
//! [`Bid`]s are ephemeral offers gathered during one allocation round; the
//! winning bid becomes an [`Allocation`]. Allocations are never edited once
//! execution starts: reassignment appends a new allocation and marks the
//! previous one superseded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::task::SubTaskId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BidError {
    #[error("Invalid bid from agent {agent_id}: {reason}")]
    InvalidBid { agent_id: AgentId, reason: String },

    #[error("Invalid bid cost {cost} from agent {agent_id}")]
    InvalidBidCost { agent_id: AgentId, cost: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub sub_task_id: SubTaskId,
    pub agent_id: AgentId,
    pub cost: f64,
    pub confidence: f64,
}

impl Bid {
    pub fn new(sub_task_id: SubTaskId, agent_id: AgentId, cost: f64, confidence: f64) -> Self {
        Self {
            sub_task_id,
            agent_id,
            cost,
            confidence,
        }
    }

    /// Reject bids that cannot be scored.
    ///
    /// A cost that is not a finite number is an `InvalidBidCost` guard
    /// violation; a finite cost of zero or below is an `InvalidBid`.
    pub fn validate(&self) -> Result<(), BidError> {
        if !self.cost.is_finite() {
            return Err(BidError::InvalidBidCost {
                agent_id: self.agent_id,
                cost: self.cost,
            });
        }
        if self.cost <= 0.0 {
            return Err(BidError::InvalidBid {
                agent_id: self.agent_id,
                reason: format!("cost must be positive, got {}", self.cost),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(BidError::InvalidBid {
                agent_id: self.agent_id,
                reason: format!("confidence must be within [0, 1], got {}", self.confidence),
            });
        }
        Ok(())
    }

    /// `(confidence × reputation) / cost`. Only meaningful on a validated bid.
    pub fn score(&self, reputation: f64) -> f64 {
        (self.confidence * reputation) / self.cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub sub_task_id: SubTaskId,
    pub agent_id: AgentId,
    pub cost: f64,
    pub confidence: f64,
    /// Reputation of the winner at the time the round closed.
    pub reputation: f64,
    pub score: f64,
    /// Coordination round that produced this allocation, starting at 0.
    pub round: u32,
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
}

impl Allocation {
    pub fn from_bid(bid: &Bid, reputation: f64, round: u32) -> Self {
        Self {
            sub_task_id: bid.sub_task_id,
            agent_id: bid.agent_id,
            cost: bid.cost,
            confidence: bid.confidence,
            reputation,
            score: bid.score(reputation),
            round,
            superseded: false,
            created_at: Utc::now(),
        }
    }

    pub fn supersede(&mut self) {
        self.superseded = true;
    }
}
