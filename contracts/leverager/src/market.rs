//! Scaled-Balance Adapter
//!
//! Reads the shared vault's scaled balances from the lending market and
//! converts a position's scaled balances into real token amounts.

use leverager_common::{
    constants::market::LTV_MASK,
    errors::LeveragerResult,
    math::ray_mul,
    types::{Address, Position, ReserveTokens, ScaledBalances, Valuation},
};

use crate::interfaces::LendingMarket;

/// Borrowed view of the lending market for one reserve
pub struct ScaledBalanceAdapter<'a> {
    market: &'a dyn LendingMarket,
    asset: Address,
}

impl<'a> ScaledBalanceAdapter<'a> {
    pub fn new(market: &'a dyn LendingMarket, asset: Address) -> Self {
        Self { market, asset }
    }

    pub fn reserve_tokens(&self) -> LeveragerResult<ReserveTokens> {
        self.market.reserve_tokens(&self.asset)
    }

    /// Scaled collateral and debt held by `holder`
    pub fn scaled_balances(&self, holder: &Address) -> LeveragerResult<ScaledBalances> {
        let tokens = self.reserve_tokens()?;
        Ok(ScaledBalances {
            collateral: self.market.scaled_balance_of(&tokens.collateral_token, holder),
            debt: self.market.scaled_balance_of(&tokens.variable_debt_token, holder),
        })
    }

    /// Real-token value of a position at the current indices
    pub fn valuation(&self, position: &Position) -> LeveragerResult<Valuation> {
        let income = self.market.normalized_income(&self.asset);
        let debt_index = self.market.normalized_variable_debt(&self.asset);

        Ok(Valuation {
            collateral_value: ray_mul(position.scaled_collateral, income)?,
            debt_value: ray_mul(position.scaled_debt, debt_index)?,
        })
    }

    /// `max(0, collateral_value - debt_value)`
    pub fn unstakeable(&self, position: &Position) -> LeveragerResult<u128> {
        Ok(self.valuation(position)?.unstakeable())
    }

    /// Loan-to-value limit of the reserve, in basis points
    pub fn ltv_bps(&self) -> u64 {
        (self.market.configuration(&self.asset) & LTV_MASK) as u64
    }
}
