//! Mathematical Utilities for the Leverager
//!
//! Checked fixed-point helpers. Every function returns an error instead of
//! wrapping; arithmetic errors are fatal to the enclosing operation.

use crate::constants::{
    precision::{HALF_RAY, PRECISION, RAY},
    ratio::RATIO_DIVISOR,
};
use crate::errors::{LeveragerError, LeveragerResult};
use alloy_primitives::U256;

/// Multiply a scaled balance by a ray index, rounding half up
///
/// `result = (scaled * index + RAY/2) / RAY`
///
/// The product is formed in 256 bits. Fails with `RayMulOverflow` only if the
/// rounded result does not fit back into u128.
pub fn ray_mul(scaled: u128, index: u128) -> LeveragerResult<u128> {
    if scaled == 0 || index == 0 {
        return Ok(0);
    }

    let wide = (U256::from(scaled) * U256::from(index) + U256::from(HALF_RAY)) / U256::from(RAY);
    u128::try_from(wide).map_err(|_| LeveragerError::RayMulOverflow { scaled, index })
}

/// `a * b / denominator`, truncating
///
/// The product is formed in 256 bits; `Overflow` means the quotient itself
/// does not fit in u128.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> LeveragerResult<u128> {
    if denominator == 0 {
        return Err(LeveragerError::DivisionByZero);
    }
    let wide = U256::from(a) * U256::from(b) / U256::from(denominator);
    u128::try_from(wide).map_err(|_| LeveragerError::Overflow)
}

/// Flash-loan size that brings a fresh deposit to the target ratio
///
/// `loan = deposit * ratio / (RATIO_DIVISOR - ratio)`
pub fn calculate_loan_amount(deposit: u128, ratio: u64) -> LeveragerResult<u128> {
    if ratio >= RATIO_DIVISOR {
        return Err(LeveragerError::InvalidRatio { ratio });
    }
    mul_div(deposit, ratio as u128, (RATIO_DIVISOR - ratio) as u128)
}

/// Scaled debt retired when withdrawing `withdraw` out of `unstakeable`
///
/// `repay = scaled_debt * withdraw / unstakeable`
pub fn calculate_repay_amount(
    scaled_debt: u128,
    withdraw: u128,
    unstakeable: u128,
) -> LeveragerResult<u128> {
    mul_div(scaled_debt, withdraw, unstakeable)
}

/// Index increment for `reward` spread over `total_scaled_collateral`
pub fn reward_index_delta(reward: u128, total_scaled_collateral: u128) -> LeveragerResult<u128> {
    mul_div(reward, PRECISION, total_scaled_collateral)
}

/// Reward accrued by `scaled_collateral` at `index`, truncating
pub fn accrued_reward(index: u128, scaled_collateral: u128) -> LeveragerResult<u128> {
    mul_div(index, scaled_collateral, PRECISION)
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> LeveragerResult<u128> {
    a.checked_add(b).ok_or(LeveragerError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> LeveragerResult<u128> {
    a.checked_sub(b).ok_or(LeveragerError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_mul_identity_index() {
        assert_eq!(ray_mul(12_345, RAY).unwrap(), 12_345);
        assert_eq!(ray_mul(0, RAY * 3).unwrap(), 0);
    }

    #[test]
    fn test_ray_mul_rounds_half_up() {
        // 1 * 1.5 = 1.5 -> 2
        assert_eq!(ray_mul(1, RAY + HALF_RAY).unwrap(), 2);
        // 1 * 1.4999.. -> 1
        assert_eq!(ray_mul(1, RAY + HALF_RAY - 1).unwrap(), 1);
        // 100 * 1.05 = 105
        assert_eq!(ray_mul(100, RAY + RAY / 20).unwrap(), 105);
    }

    #[test]
    fn test_ray_mul_large_balances() {
        // 1e18 scaled at a unit index is well inside range
        assert_eq!(ray_mul(10u128.pow(18), RAY).unwrap(), 10u128.pow(18));
        // 1e30 scaled at 1.5x
        assert_eq!(
            ray_mul(10u128.pow(30), RAY + HALF_RAY).unwrap(),
            15 * 10u128.pow(29)
        );
        // u128::MAX at a unit index is exact
        assert_eq!(ray_mul(u128::MAX, RAY).unwrap(), u128::MAX);
    }

    #[test]
    fn test_ray_mul_overflow_boundary() {
        let index = 2 * RAY;
        let limit = u128::MAX / 2;

        assert_eq!(ray_mul(limit, index).unwrap(), u128::MAX - 1);
        // limit + 1 doubles to u128::MAX + 1
        assert_eq!(
            ray_mul(limit + 1, index),
            Err(LeveragerError::RayMulOverflow { scaled: limit + 1, index })
        );
        assert_eq!(
            ray_mul(u128::MAX, u128::MAX),
            Err(LeveragerError::RayMulOverflow { scaled: u128::MAX, index: u128::MAX })
        );
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        assert_eq!(mul_div(u128::MAX, 2, 4).unwrap(), u128::MAX / 2);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(LeveragerError::Overflow));
    }

    #[test]
    fn test_loan_amount_half_ratio() {
        // 500,000 ppm: borrow as much as deposited
        assert_eq!(calculate_loan_amount(100, 500_000).unwrap(), 100);
        // 750,000 ppm: 3x the deposit
        assert_eq!(calculate_loan_amount(100, 750_000).unwrap(), 300);
        // zero ratio: no loan
        assert_eq!(calculate_loan_amount(100, 0).unwrap(), 0);
    }

    #[test]
    fn test_loan_amount_rejects_full_ratio() {
        assert_eq!(
            calculate_loan_amount(100, RATIO_DIVISOR),
            Err(LeveragerError::InvalidRatio { ratio: RATIO_DIVISOR })
        );
    }

    #[test]
    fn test_repay_amount_proportional() {
        // Withdrawing half of what is unstakeable retires half the debt
        assert_eq!(calculate_repay_amount(100, 50, 100).unwrap(), 50);
        assert_eq!(calculate_repay_amount(100, 100, 100).unwrap(), 100);
        assert_eq!(
            calculate_repay_amount(100, 1, 0),
            Err(LeveragerError::DivisionByZero)
        );
    }

    #[test]
    fn test_reward_index_round_trip() {
        let delta = reward_index_delta(1_000, 200).unwrap();
        assert_eq!(accrued_reward(delta, 100).unwrap(), 500);
    }

    #[test]
    fn test_reward_index_large_reward() {
        let e18 = 10u128.pow(18);
        // 1e24 reward over 1e21 scaled: 1000 reward per scaled unit
        let delta = reward_index_delta(10u128.pow(24), 1_000 * e18).unwrap();
        assert_eq!(delta, 1_000 * PRECISION);
        assert_eq!(accrued_reward(delta, 1_000 * e18).unwrap(), 10u128.pow(24));

        // 10e18 over 1e18 scaled
        let delta = reward_index_delta(10 * e18, e18).unwrap();
        assert_eq!(accrued_reward(delta, e18).unwrap(), 10 * e18);
    }

    #[test]
    fn test_safe_ops() {
        assert_eq!(safe_add(u128::MAX, 1), Err(LeveragerError::Overflow));
        assert_eq!(safe_sub(0, 1), Err(LeveragerError::Underflow));
        assert_eq!(safe_sub(5, 3).unwrap(), 2);
    }
}
