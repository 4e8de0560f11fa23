//! Leverager Events
//!
//! Events are emitted as operations commit and can be indexed off-chain.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, ClaimId};

/// Event types for indexing and filtering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Position Events (0x01 - 0x1F)
    Staked = 0x01,
    Unstaked = 0x02,

    // Reward Events (0x20 - 0x3F)
    RewardsRefreshed = 0x20,
    RewardClaimed = 0x21,
    ClaimSettled = 0x22,

    // Configuration Events (0x80 - 0x9F)
    LeverageRatioUpdated = 0x80,
}

/// All events emitted by the leverager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LeveragerEvent {
    /// Emitted when a deposit has been looped into the shared position
    Staked {
        user: Address,
        amount: u128,
        loan_amount: u128,
        scaled_collateral_delta: u128,
        scaled_debt_delta: u128,
        timestamp: u64,
    },

    /// Emitted when a withdrawal has been unlooped out of the shared position
    Unstaked {
        user: Address,
        amount: u128,
        repay_amount: u128,
        timestamp: u64,
    },

    /// Emitted when newly observed reward is folded into the global index
    RewardsRefreshed {
        reward: u128,
        new_index: u128,
        total_scaled_collateral: u128,
        timestamp: u64,
    },

    /// Emitted when pending reward is converted into a vesting claim
    RewardClaimed {
        claim_id: ClaimId,
        beneficiary: Address,
        amount: u128,
        unlock_time: u64,
        timestamp: u64,
    },

    /// Emitted when a vested claim is paid out
    ClaimSettled {
        claim_id: ClaimId,
        beneficiary: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Emitted when the admin changes the target leverage ratio
    LeverageRatioUpdated {
        old_ratio: u64,
        new_ratio: u64,
        timestamp: u64,
    },
}

impl LeveragerEvent {
    /// Get the event type
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Staked { .. } => EventType::Staked,
            Self::Unstaked { .. } => EventType::Unstaked,
            Self::RewardsRefreshed { .. } => EventType::RewardsRefreshed,
            Self::RewardClaimed { .. } => EventType::RewardClaimed,
            Self::ClaimSettled { .. } => EventType::ClaimSettled,
            Self::LeverageRatioUpdated { .. } => EventType::LeverageRatioUpdated,
        }
    }

    /// Get the timestamp when event occurred
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Staked { timestamp, .. }
            | Self::Unstaked { timestamp, .. }
            | Self::RewardsRefreshed { timestamp, .. }
            | Self::RewardClaimed { timestamp, .. }
            | Self::ClaimSettled { timestamp, .. }
            | Self::LeverageRatioUpdated { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LeveragerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: LeveragerEvent) {
        self.events.push(event);
    }

    /// Append every event from another log
    pub fn extend(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Get all events
    pub fn events(&self) -> &[LeveragerEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<LeveragerEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&LeveragerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
