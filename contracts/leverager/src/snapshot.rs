//! Persisted State Surface
//!
//! Flat, ordered view of the ledger for storage and cross-version checks.
//! `state_root` commits to the canonical borsh encoding.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use leverager_common::{
    errors::{LeveragerError, LeveragerResult},
    types::{Address, Claim, ClaimId, PoolState, Position},
};

use crate::claims::ClaimBook;
use crate::ledger::LedgerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LeveragerSnapshot {
    pub pool: PoolState,
    pub target_leverage_ratio: u64,
    /// Sorted by address
    pub positions: Vec<(Address, Position)>,
    /// Sorted by claim id
    pub claims: Vec<(ClaimId, Claim)>,
    /// Sorted by beneficiary; ids in set order
    pub outstanding: Vec<(Address, Vec<ClaimId>)>,
}

impl LeveragerSnapshot {
    pub fn capture(state: &LedgerState) -> Self {
        Self {
            pool: state.pool,
            target_leverage_ratio: state.target_leverage_ratio,
            positions: state.positions.iter().map(|(a, p)| (*a, *p)).collect(),
            claims: state.claims.claims().map(|(id, c)| (*id, *c)).collect(),
            outstanding: state
                .claims
                .outstanding_sets()
                .map(|(a, set)| (*a, set.as_slice().to_vec()))
                .collect(),
        }
    }

    /// Rebuild ledger state, rejecting snapshots whose totals disagree
    pub fn restore(self) -> LeveragerResult<LedgerState> {
        let state = LedgerState {
            pool: self.pool,
            target_leverage_ratio: self.target_leverage_ratio,
            positions: self.positions.into_iter().collect(),
            claims: ClaimBook::from_parts(self.claims, self.outstanding),
        };

        if state.summed_collateral()? != state.pool.total_scaled_collateral {
            return Err(LeveragerError::InvalidConfig {
                reason: "snapshot collateral total does not match positions",
            });
        }
        let highest_claim = state.claims.claims().map(|(id, _)| *id).max().unwrap_or(0);
        if highest_claim > state.pool.claim_sequence {
            return Err(LeveragerError::InvalidConfig {
                reason: "snapshot claim sequence behind existing claims",
            });
        }
        Ok(state)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }

    /// SHA-256 over the borsh encoding
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        let result = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&result);
        root
    }
}
