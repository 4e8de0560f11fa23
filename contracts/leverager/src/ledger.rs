//! Position Ledger
//!
//! Owned aggregate of everything the leverager persists. Guarded operations
//! work on a clone and commit it only on success.

use std::collections::BTreeMap;

use leverager_common::{
    errors::{LeveragerError, LeveragerResult},
    math::{safe_add, safe_sub},
    types::{Address, ClaimId, PoolState, Position, ScaledBalances},
};

use crate::claims::ClaimBook;
use crate::rewards;

#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub pool: PoolState,
    pub target_leverage_ratio: u64,
    pub positions: BTreeMap<Address, Position>,
    pub claims: ClaimBook,
}

impl LedgerState {
    pub fn new(target_leverage_ratio: u64) -> Self {
        Self {
            target_leverage_ratio,
            ..Default::default()
        }
    }

    /// Position of `user`, all zeros if never touched
    pub fn position(&self, user: &Address) -> Position {
        self.positions.get(user).copied().unwrap_or_default()
    }

    fn position_mut(&mut self, user: &Address) -> &mut Position {
        self.positions.entry(*user).or_default()
    }

    /// Accrue reward for `user` against the current index
    pub fn checkpoint(&mut self, user: &Address) -> LeveragerResult<()> {
        let pool = self.pool;
        rewards::checkpoint(&pool, self.position_mut(user))
    }

    /// Reset `user`'s baseline to its current collateral
    pub fn rebaseline(&mut self, user: &Address) -> LeveragerResult<()> {
        let pool = self.pool;
        rewards::rebaseline(&pool, self.position_mut(user))
    }

    /// Credit realized scaled deltas to `user` and the pool total
    pub fn credit(&mut self, user: &Address, delta: ScaledBalances) -> LeveragerResult<()> {
        let total = safe_add(self.pool.total_scaled_collateral, delta.collateral)?;
        let position = self.position_mut(user);
        position.scaled_collateral = safe_add(position.scaled_collateral, delta.collateral)?;
        position.scaled_debt = safe_add(position.scaled_debt, delta.debt)?;
        self.pool.total_scaled_collateral = total;
        Ok(())
    }

    /// Remove scaled collateral and debt from `user` and the pool total
    pub fn debit(&mut self, user: &Address, collateral: u128, debt: u128) -> LeveragerResult<()> {
        let total = safe_sub(self.pool.total_scaled_collateral, collateral)?;
        let position = self.position_mut(user);
        position.scaled_collateral = safe_sub(position.scaled_collateral, collateral)?;
        position.scaled_debt = safe_sub(position.scaled_debt, debt)?;
        self.pool.total_scaled_collateral = total;
        Ok(())
    }

    /// Zero and return `user`'s pending reward
    pub fn take_pending(&mut self, user: &Address) -> u128 {
        std::mem::take(&mut self.position_mut(user).pending_reward)
    }

    /// Allocate the next claim id
    pub fn next_claim_id(&mut self) -> LeveragerResult<ClaimId> {
        self.pool.claim_sequence = self
            .pool
            .claim_sequence
            .checked_add(1)
            .ok_or(LeveragerError::Overflow)?;
        Ok(self.pool.claim_sequence)
    }

    /// Sum of every position's scaled collateral
    pub fn summed_collateral(&self) -> LeveragerResult<u128> {
        self.positions
            .values()
            .map(|p| p.scaled_collateral)
            .try_fold(0u128, safe_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    #[test]
    fn test_credit_and_debit_track_total() {
        let mut state = LedgerState::new(500_000);
        state.credit(&ALICE, ScaledBalances { collateral: 200, debt: 100 }).unwrap();
        state.credit(&BOB, ScaledBalances { collateral: 50, debt: 10 }).unwrap();

        assert_eq!(state.pool.total_scaled_collateral, 250);
        assert_eq!(state.summed_collateral().unwrap(), 250);

        state.debit(&ALICE, 150, 50).unwrap();
        assert_eq!(state.position(&ALICE).scaled_collateral, 50);
        assert_eq!(state.position(&ALICE).scaled_debt, 50);
        assert_eq!(state.pool.total_scaled_collateral, 100);
    }

    #[test]
    fn test_debit_underflow() {
        let mut state = LedgerState::new(0);
        state.credit(&ALICE, ScaledBalances { collateral: 10, debt: 5 }).unwrap();

        assert_eq!(state.debit(&ALICE, 10, 6), Err(LeveragerError::Underflow));
    }

    #[test]
    fn test_untouched_position_is_zero() {
        let state = LedgerState::new(0);
        assert!(state.position(&ALICE).is_empty());
        assert!(state.positions.is_empty());
    }

    #[test]
    fn test_claim_ids_start_at_one() {
        let mut state = LedgerState::new(0);
        assert_eq!(state.next_claim_id().unwrap(), 1);
        assert_eq!(state.next_claim_id().unwrap(), 2);
    }
}
