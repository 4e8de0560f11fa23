//! Reward Accumulator
//!
//! A single global index tracks reward per unit of scaled collateral.
//! Positions settle against it lazily: `checkpoint` before their collateral
//! changes, `rebaseline` after.

use tracing::debug;

use leverager_common::{
    errors::{LeveragerError, LeveragerResult},
    math::{accrued_reward, reward_index_delta, safe_add},
    types::{Address, PoolState, Position},
};

use crate::interfaces::{IncentiveController, LendingMarket};

/// Fold newly emitted reward into the global index
///
/// No-op (returns 0) when nothing is staked or nothing is pending. Otherwise
/// claims the pending reward on behalf of the shared vault and returns it.
pub fn refresh(
    pool: &mut PoolState,
    market: &dyn LendingMarket,
    incentives: &mut dyn IncentiveController,
    asset: &Address,
    shared_vault: &Address,
) -> LeveragerResult<u128> {
    if pool.total_scaled_collateral == 0 {
        return Ok(0);
    }

    let tokens = market.reserve_tokens(asset)?.incentivized();
    let pending = incentives
        .pending_rewards(shared_vault, &tokens)
        .into_iter()
        .try_fold(0u128, safe_add)?;
    if pending == 0 {
        return Ok(0);
    }

    let reward = incentives.claim(shared_vault, &tokens)?;
    if reward == 0 {
        return Ok(0);
    }

    let delta = reward_index_delta(reward, pool.total_scaled_collateral)?;
    pool.global_reward_index = safe_add(pool.global_reward_index, delta)?;
    pool.total_reward_distributed = safe_add(pool.total_reward_distributed, reward)?;

    debug!(
        reward,
        new_index = pool.global_reward_index,
        total_scaled_collateral = pool.total_scaled_collateral,
        "reward index refreshed"
    );
    Ok(reward)
}

/// Reward accrued by `position` since its last baseline
pub fn preview_pending(pool: &PoolState, position: &Position) -> LeveragerResult<u128> {
    let accrued = accrued_reward(pool.global_reward_index, position.scaled_collateral)?;
    let fresh = accrued
        .checked_sub(position.reward_debt_baseline)
        .ok_or(LeveragerError::Underflow)?;
    safe_add(position.pending_reward, fresh)
}

/// Move accrued reward into `pending_reward`
pub fn checkpoint(pool: &PoolState, position: &mut Position) -> LeveragerResult<()> {
    position.pending_reward = preview_pending(pool, position)?;
    Ok(())
}

/// Reset the baseline to the position's current collateral
pub fn rebaseline(pool: &PoolState, position: &mut Position) -> LeveragerResult<()> {
    position.reward_debt_baseline =
        accrued_reward(pool.global_reward_index, position.scaled_collateral)?;
    Ok(())
}
