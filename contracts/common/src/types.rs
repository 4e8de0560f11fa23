//! Core Types for the Leverager
//!
//! Data structures shared by the engine, its events and its persisted
//! state surface.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for addresses (32-byte identifier)
pub type Address = [u8; 32];

/// Type alias for claim identifiers
pub type ClaimId = u64;

/// The all-zero address, never a valid participant
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Position Types ============

/// Per-participant ledger record
///
/// Balances are scaled, i.e. relative to the market's growth indices.
/// A position is created implicitly with all fields zero and never deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct Position {
    /// Share of the shared vault's collateral-receipt balance
    pub scaled_collateral: u128,
    /// Share of the shared vault's variable-debt balance
    pub scaled_debt: u128,
    /// Reward accrued up to the last checkpoint, not yet claimed
    pub pending_reward: u128,
    /// `global_reward_index * scaled_collateral / PRECISION` at last checkpoint
    pub reward_debt_baseline: u128,
}

impl Position {
    /// True when the position holds neither collateral nor debt
    pub fn is_empty(&self) -> bool {
        self.scaled_collateral == 0 && self.scaled_debt == 0
    }
}

/// Pool-wide accounting state
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct PoolState {
    /// Cumulative reward per unit of scaled collateral, scaled by PRECISION
    pub global_reward_index: u128,
    /// Sum of every position's `scaled_collateral`
    pub total_scaled_collateral: u128,
    /// Cumulative reward observed and claimed from the incentive controller
    pub total_reward_distributed: u128,
    /// Last allocated claim id (0 = none yet)
    pub claim_sequence: ClaimId,
}

// ============ Claim Types ============

/// Time-locked reward claim
///
/// Immutable once created except for the one-way `settled` flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Claim {
    /// Reward amount, always positive
    pub amount: u128,
    /// Recipient of the payout
    pub beneficiary: Address,
    /// Set exactly once, on settlement
    pub settled: bool,
    /// Earliest timestamp at which settlement is allowed
    pub unlock_time: u64,
}

impl Claim {
    /// Whether the vesting delay has elapsed at `now`
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.unlock_time
    }
}

// ============ Market Types ============

/// Token addresses associated with a market reserve
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct ReserveTokens {
    /// Interest-bearing collateral-receipt token
    pub collateral_token: Address,
    /// Variable-rate debt token
    pub variable_debt_token: Address,
}

impl ReserveTokens {
    /// Token list queried against the incentive controller
    pub fn incentivized(&self) -> [Address; 2] {
        [self.collateral_token, self.variable_debt_token]
    }
}

/// Scaled balances of one holder in a reserve
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct ScaledBalances {
    pub collateral: u128,
    pub debt: u128,
}

/// Real-token valuation of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Valuation {
    pub collateral_value: u128,
    pub debt_value: u128,
}

impl Valuation {
    /// `max(0, collateral_value - debt_value)`
    pub fn unstakeable(&self) -> u128 {
        self.collateral_value.saturating_sub(self.debt_value)
    }

    /// True when debt meets or exceeds collateral
    pub fn is_underwater(&self) -> bool {
        self.debt_value >= self.collateral_value
    }
}
