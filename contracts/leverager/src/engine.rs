//! Leverage Engine
//!
//! Loop and unloop run as a two-phase protocol around a flash loan:
//!
//! ```text
//! Idle -> Requested(PendingFlash) -> Fulfilled { premium } -> Idle
//! ```
//!
//! The request is recorded before the provider is called, the callback
//! checks it and marks it fulfilled, and the engine reconciles after the
//! provider returns. A callback without a matching request is rejected.

use borsh::{BorshDeserialize, BorshSerialize};
use tracing::{debug, warn};

use leverager_common::{
    constants::market::VARIABLE_RATE_MODE,
    errors::{LeveragerError, LeveragerResult},
    math::{calculate_loan_amount, calculate_repay_amount, safe_add, safe_sub},
    types::{Address, Position, ScaledBalances},
};

use crate::config::LeveragerConfig;
use crate::interfaces::{
    FlashLoanProvider, FlashLoanReceiver, LendingMarket, SharedVault, TokenLedger,
};
use crate::market::ScaledBalanceAdapter;

// ============ Flash Session ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Loop,
    Unloop,
}

/// An open flash-loan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFlash {
    pub kind: FlashKind,
    pub asset: Address,
    pub amount: u128,
    pub user: Address,
    /// Shared vault's scaled balances when the request was opened
    pub before: ScaledBalances,
}

/// Continuation state of the flash-loan round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashSession {
    #[default]
    Idle,
    Requested(PendingFlash),
    Fulfilled { request: PendingFlash, premium: u128 },
}

impl FlashSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Payload carried through the provider to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum FlashParams {
    Loop { user: Address },
    Unloop { withdraw_amount: u128, user: Address },
}

impl FlashParams {
    pub fn encode(&self) -> LeveragerResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| LeveragerError::InvalidCallbackData)
    }

    pub fn decode(data: &[u8]) -> LeveragerResult<Self> {
        borsh::from_slice(data).map_err(|_| LeveragerError::InvalidCallbackData)
    }
}

// ============ Loop Callback ============

/// Receiver side of a loop flash loan
///
/// Borrows only the pieces of the leverager the callback touches, so it can
/// run while the provider is mutably borrowed.
pub struct LoopCallback<'a> {
    pub config: &'a LeveragerConfig,
    pub provider: Address,
    pub market: &'a mut dyn LendingMarket,
    pub tokens: &'a mut dyn TokenLedger,
    pub session: &'a mut FlashSession,
}

impl LoopCallback<'_> {
    fn authenticate(&self, caller: &Address, initiator: &Address) -> LeveragerResult<()> {
        if *caller != self.provider {
            warn!("flash callback from unexpected caller");
            return Err(LeveragerError::CallerNotExpectedProvider { caller: *caller });
        }
        if *initiator != self.config.leverager {
            warn!("flash callback initiated by another account");
            return Err(LeveragerError::InitiatorNotLeverager {
                initiator: *initiator,
            });
        }
        Ok(())
    }

    fn open_request(
        &self,
        asset: &Address,
        amount: u128,
        data: &[u8],
    ) -> LeveragerResult<PendingFlash> {
        let request = match *self.session {
            FlashSession::Requested(request)
                if request.kind == FlashKind::Loop
                    && request.asset == *asset
                    && request.amount == amount =>
            {
                request
            }
            _ => {
                warn!(amount, "flash callback without a matching request");
                return Err(LeveragerError::UnexpectedFlashCallback);
            }
        };

        match FlashParams::decode(data)? {
            FlashParams::Loop { user } if user == request.user => Ok(request),
            _ => Err(LeveragerError::InvalidCallbackData),
        }
    }
}

impl FlashLoanReceiver for LoopCallback<'_> {
    fn execute_operation(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        premium: u128,
        initiator: &Address,
        data: &[u8],
    ) -> LeveragerResult<bool> {
        self.authenticate(caller, initiator)?;
        let request = self.open_request(asset, amount, data)?;

        let vault = self.config.shared_vault;
        let owed = safe_add(amount, premium)?;

        self.market.deposit(asset, amount, &vault)?;
        self.market.borrow(asset, owed, VARIABLE_RATE_MODE, &vault)?;
        self.tokens
            .approve(asset, &self.config.leverager, &self.provider, owed)?;

        *self.session = FlashSession::Fulfilled { request, premium };
        debug!(amount, premium, "loop flash loan fulfilled");
        Ok(true)
    }
}

// ============ Loop ============

/// Collaborators a loop needs
pub struct LoopContext<'a> {
    pub config: &'a LeveragerConfig,
    pub market: &'a mut dyn LendingMarket,
    pub tokens: &'a mut dyn TokenLedger,
    pub flash: &'a mut dyn FlashLoanProvider,
    pub session: &'a mut FlashSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub loan_amount: u128,
    pub premium: u128,
    /// Realized change in the shared vault's scaled balances
    pub delta: ScaledBalances,
}

/// Deposit `deposit_amount` for the shared vault and lever it up to `ratio`
///
/// The deposit must already sit with the leverager.
pub fn execute_loop(
    ctx: &mut LoopContext<'_>,
    user: &Address,
    deposit_amount: u128,
    ratio: u64,
) -> LeveragerResult<LoopOutcome> {
    if deposit_amount == 0 {
        return Err(LeveragerError::InvalidAmount {
            amount: deposit_amount,
        });
    }

    let asset = ctx.config.asset;
    let vault = ctx.config.shared_vault;

    let snapshot = ScaledBalanceAdapter::new(&*ctx.market, asset).scaled_balances(&vault)?;
    ctx.market.deposit(&asset, deposit_amount, &vault)?;

    let loan_amount = calculate_loan_amount(deposit_amount, ratio)?;
    let (before, premium) = if loan_amount == 0 {
        (snapshot, 0)
    } else {
        *ctx.session = FlashSession::Requested(PendingFlash {
            kind: FlashKind::Loop,
            asset,
            amount: loan_amount,
            user: *user,
            before: snapshot,
        });
        let data = FlashParams::Loop { user: *user }.encode()?;
        debug!(deposit_amount, loan_amount, "requesting loop flash loan");

        let mut callback = LoopCallback {
            config: ctx.config,
            provider: ctx.flash.address(),
            market: &mut *ctx.market,
            tokens: &mut *ctx.tokens,
            session: &mut *ctx.session,
        };
        ctx.flash.flash_loan_simple(
            &ctx.config.leverager,
            &mut callback,
            &ctx.config.leverager,
            &asset,
            loan_amount,
            &data,
            ctx.config.referral_code,
        )?;

        match std::mem::take(&mut *ctx.session) {
            FlashSession::Fulfilled { request, premium } => (request.before, premium),
            _ => return Err(LeveragerError::FlashLoanNotFulfilled),
        }
    };

    let after = ScaledBalanceAdapter::new(&*ctx.market, asset).scaled_balances(&vault)?;
    let delta = ScaledBalances {
        collateral: safe_sub(after.collateral, before.collateral)?,
        debt: safe_sub(after.debt, before.debt)?,
    };

    Ok(LoopOutcome {
        loan_amount,
        premium,
        delta,
    })
}

// ============ Unloop ============

/// Collaborators an unloop needs
pub struct UnloopContext<'a> {
    pub config: &'a LeveragerConfig,
    pub market: &'a dyn LendingMarket,
    pub flash: &'a mut dyn FlashLoanProvider,
    pub vault: &'a mut dyn SharedVault,
    pub session: &'a mut FlashSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnloopOutcome {
    pub repay_amount: u128,
    pub unstakeable: u128,
    /// Realized decrease in the shared vault's scaled balances
    pub released: ScaledBalances,
}

/// Unwind `withdraw_amount` of `position` through the shared vault
///
/// The vault receives the flash loan; its unwind repays market debt,
/// withdraws collateral and pays `user`. The ledger decrement is left to the
/// caller; `released` only reports what the vault actually unwound.
pub fn execute_unloop(
    ctx: &mut UnloopContext<'_>,
    user: &Address,
    position: &Position,
    withdraw_amount: u128,
) -> LeveragerResult<UnloopOutcome> {
    if withdraw_amount == 0 {
        return Err(LeveragerError::InvalidAmount {
            amount: withdraw_amount,
        });
    }

    let asset = ctx.config.asset;
    let adapter = ScaledBalanceAdapter::new(ctx.market, asset);

    let unstakeable = adapter.unstakeable(position)?;
    if withdraw_amount > unstakeable {
        return Err(LeveragerError::InvalidUnstake {
            requested: withdraw_amount,
            available: unstakeable,
        });
    }

    let repay_amount = calculate_repay_amount(position.scaled_debt, withdraw_amount, unstakeable)?;

    let vault = ctx.vault.address();
    *ctx.session = FlashSession::Requested(PendingFlash {
        kind: FlashKind::Unloop,
        asset,
        amount: repay_amount,
        user: *user,
        before: adapter.scaled_balances(&vault)?,
    });
    let data = FlashParams::Unloop {
        withdraw_amount,
        user: *user,
    }
    .encode()?;
    debug!(withdraw_amount, repay_amount, "requesting unloop flash loan");

    ctx.flash.flash_loan_simple(
        &ctx.config.leverager,
        ctx.vault.receiver(),
        &vault,
        &asset,
        repay_amount,
        &data,
        ctx.config.referral_code,
    )?;

    let before = match std::mem::take(&mut *ctx.session) {
        FlashSession::Requested(request) if request.kind == FlashKind::Unloop => request.before,
        _ => return Err(LeveragerError::UnexpectedFlashCallback),
    };
    let after = adapter.scaled_balances(&vault)?;
    let released = ScaledBalances {
        collateral: safe_sub(before.collateral, after.collateral)?,
        debt: safe_sub(before.debt, after.debt)?,
    };
    debug!(
        collateral = released.collateral,
        debt = released.debt,
        "unloop released vault balances"
    );

    Ok(UnloopOutcome {
        repay_amount,
        unstakeable,
        released,
    })
}
