//! External Collaborators
//!
//! The leverager never implements lending, flash liquidity, emissions or
//! payouts itself. It drives them through these traits. Every method that
//! stands in for a cross-contract call receives the acting address
//! explicitly, so implementations can authenticate it.

use leverager_common::{Address, LeveragerResult, ReserveTokens};

/// External lending market holding the shared collateral/debt position
pub trait LendingMarket {
    /// Supply `amount` of `asset`, crediting the collateral to `on_behalf_of`
    fn deposit(&mut self, asset: &Address, amount: u128, on_behalf_of: &Address)
        -> LeveragerResult<()>;

    /// Borrow `amount` of `asset`, charging the debt to `on_behalf_of`
    fn borrow(
        &mut self,
        asset: &Address,
        amount: u128,
        rate_mode: u8,
        on_behalf_of: &Address,
    ) -> LeveragerResult<()>;

    /// Collateral-receipt and variable-debt token of a reserve
    fn reserve_tokens(&self, asset: &Address) -> LeveragerResult<ReserveTokens>;

    /// Collateral growth index, in ray
    fn normalized_income(&self, asset: &Address) -> u128;

    /// Variable-debt growth index, in ray
    fn normalized_variable_debt(&self, asset: &Address) -> u128;

    /// Reserve configuration bitfield (LTV in bits 0..16)
    fn configuration(&self, asset: &Address) -> u128;

    /// Scaled balance of `holder` in a collateral-receipt or debt token
    fn scaled_balance_of(&self, token: &Address, holder: &Address) -> u128;
}

/// Base-asset token movements
pub trait TokenLedger {
    /// Move `amount` from `from` to `to`
    fn transfer_from(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LeveragerResult<()>;

    /// Allow `spender` to pull up to `amount` from `owner`
    fn approve(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> LeveragerResult<()>;
}

/// Receiver side of a single-transaction loan
pub trait FlashLoanReceiver {
    /// Invoked by the provider before `flash_loan_simple` returns.
    ///
    /// `caller` is the invoking contract and `initiator` the account that
    /// requested the loan. The receiver must have approved the provider for
    /// `amount + premium` by the time it returns `true`.
    fn execute_operation(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        premium: u128,
        initiator: &Address,
        data: &[u8],
    ) -> LeveragerResult<bool>;
}

/// External single-transaction loan provider
pub trait FlashLoanProvider {
    /// Identity the provider presents when calling back
    fn address(&self) -> Address;

    /// Lend `amount` to `receiver`, call it back, then collect `amount + premium`.
    ///
    /// Fails if the callback fails, returns `false`, or leaves the provider
    /// without an approval for the owed amount.
    #[allow(clippy::too_many_arguments)]
    fn flash_loan_simple(
        &mut self,
        initiator: &Address,
        receiver: &mut dyn FlashLoanReceiver,
        receiver_address: &Address,
        asset: &Address,
        amount: u128,
        data: &[u8],
        referral_code: u16,
    ) -> LeveragerResult<()>;
}

/// External reward emission source
pub trait IncentiveController {
    /// Unclaimed reward of `holder`, one entry per token in `tokens`
    fn pending_rewards(&self, holder: &Address, tokens: &[Address]) -> Vec<u128>;

    /// Claim everything owed to `holder` across `tokens`; returns the total
    fn claim(&mut self, holder: &Address, tokens: &[Address]) -> LeveragerResult<u128>;
}

/// External vesting schedule
pub trait VestingDistributor {
    /// Seconds between claim creation and settlement eligibility
    fn vest_duration(&self) -> u64;
}

/// Shared vault owning the pooled market position
///
/// Also the receiver of unloop flash loans: its unwind logic repays market
/// debt, withdraws collateral and pays the participant.
pub trait SharedVault {
    fn address(&self) -> Address;

    /// Pay a settled reward claim to `beneficiary`
    fn withdraw_for_leverager(&mut self, beneficiary: &Address, amount: u128)
        -> LeveragerResult<()>;

    /// Flash-loan receiver running the vault's unwind logic
    fn receiver(&mut self) -> &mut dyn FlashLoanReceiver;
}

/// Role registry
pub trait AccessControl {
    fn has_role(&self, role: &[u8; 32], account: &Address) -> bool;
}

/// Every collaborator the leverager talks to
pub struct Collaborators {
    pub market: Box<dyn LendingMarket>,
    pub tokens: Box<dyn TokenLedger>,
    pub flash: Box<dyn FlashLoanProvider>,
    pub incentives: Box<dyn IncentiveController>,
    pub distributor: Box<dyn VestingDistributor>,
    pub vault: Box<dyn SharedVault>,
    pub access: Box<dyn AccessControl>,
}
