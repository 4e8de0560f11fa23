//! Leverager Facade
//!
//! Public entry points. Every guarded operation:
//!
//! 1. rejects re-entry while another operation is in flight
//! 2. runs against a working copy of the ledger
//! 3. commits the copy and its events only if it succeeds
//!
//! `execute_operation` is the one unguarded entry point. It is reachable only
//! by the configured flash-loan provider for a request this leverager opened.

use tracing::{info, warn};

use leverager_common::{
    constants::roles::ADMIN,
    errors::{LeveragerError, LeveragerResult},
    events::{EventLog, LeveragerEvent},
    math::safe_add,
    types::{Address, Claim, ClaimId, PoolState, Position, Valuation},
};

use crate::config::{validate_ratio, LeveragerConfig};
use crate::engine::{self, FlashSession, LoopCallback, LoopContext, UnloopContext};
use crate::interfaces::{Collaborators, FlashLoanReceiver};
use crate::ledger::LedgerState;
use crate::market::ScaledBalanceAdapter;
use crate::rewards;
use crate::snapshot::LeveragerSnapshot;

/// Who is calling, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub caller: Address,
    pub timestamp: u64,
}

impl Invocation {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

pub struct Leverager {
    config: LeveragerConfig,
    collab: Collaborators,
    state: LedgerState,
    session: FlashSession,
    entered: bool,
    events: EventLog,
}

impl Leverager {
    /// Create a leverager with an empty ledger
    ///
    /// # Errors
    /// `InvalidConfig` if the vault collaborator disagrees with the config,
    /// `InvalidRatio` / `RatioExceedsLtv` if the ratio is out of range.
    pub fn new(config: LeveragerConfig, collab: Collaborators) -> LeveragerResult<Self> {
        let state = LedgerState::new(config.target_leverage_ratio);
        Self::with_state(config, collab, state)
    }

    /// Resume from a persisted snapshot
    pub fn from_snapshot(
        config: LeveragerConfig,
        collab: Collaborators,
        snapshot: LeveragerSnapshot,
    ) -> LeveragerResult<Self> {
        let state = snapshot.restore()?;
        Self::with_state(config, collab, state)
    }

    fn with_state(
        config: LeveragerConfig,
        collab: Collaborators,
        state: LedgerState,
    ) -> LeveragerResult<Self> {
        if config.shared_vault != collab.vault.address() {
            return Err(LeveragerError::InvalidConfig {
                reason: "shared_vault does not match vault collaborator",
            });
        }
        collab.market.reserve_tokens(&config.asset)?;

        let ltv_bps = ScaledBalanceAdapter::new(collab.market.as_ref(), config.asset).ltv_bps();
        config.validate(ltv_bps)?;
        validate_ratio(state.target_leverage_ratio, ltv_bps)?;

        info!(
            ratio = state.target_leverage_ratio,
            ltv_bps,
            positions = state.positions.len(),
            "leverager initialized"
        );

        Ok(Self {
            config,
            collab,
            state,
            session: FlashSession::Idle,
            entered: false,
            events: EventLog::new(),
        })
    }

    // ============ Guard ============

    fn transact<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self, &mut LedgerState, &mut EventLog) -> LeveragerResult<T>,
    ) -> LeveragerResult<T> {
        if self.entered {
            warn!(operation, "rejected reentrant call");
            return Err(LeveragerError::ReentrantCall);
        }
        self.entered = true;

        let mut working = self.state.clone();
        let mut events = EventLog::new();
        let result = f(self, &mut working, &mut events);

        self.entered = false;
        self.session = FlashSession::Idle;

        match result {
            Ok(value) => {
                self.state = working;
                self.events.extend(events);
                Ok(value)
            }
            Err(err) => {
                warn!(
                    operation,
                    code = err.code(),
                    fatal = err.is_fatal(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "operation aborted"
                );
                Err(err)
            }
        }
    }

    fn refresh_into(
        &mut self,
        state: &mut LedgerState,
        events: &mut EventLog,
        timestamp: u64,
    ) -> LeveragerResult<u128> {
        let reward = rewards::refresh(
            &mut state.pool,
            self.collab.market.as_ref(),
            self.collab.incentives.as_mut(),
            &self.config.asset,
            &self.config.shared_vault,
        )?;
        if reward > 0 {
            events.emit(LeveragerEvent::RewardsRefreshed {
                reward,
                new_index: state.pool.global_reward_index,
                total_scaled_collateral: state.pool.total_scaled_collateral,
                timestamp,
            });
        }
        Ok(reward)
    }

    // ============ Positions ============

    /// Deposit `amount` and lever it up to the target ratio
    pub fn stake(&mut self, inv: Invocation, amount: u128) -> LeveragerResult<()> {
        self.transact("stake", |this, state, events| {
            if amount == 0 {
                return Err(LeveragerError::InvalidAmount { amount });
            }
            let user = inv.caller;

            this.refresh_into(state, events, inv.timestamp)?;
            state.checkpoint(&user)?;

            this.collab.tokens.transfer_from(
                &this.config.asset,
                &user,
                &this.config.leverager,
                amount,
            )?;

            let outcome = engine::execute_loop(
                &mut LoopContext {
                    config: &this.config,
                    market: this.collab.market.as_mut(),
                    tokens: this.collab.tokens.as_mut(),
                    flash: this.collab.flash.as_mut(),
                    session: &mut this.session,
                },
                &user,
                amount,
                state.target_leverage_ratio,
            )?;

            state.credit(&user, outcome.delta)?;
            state.rebaseline(&user)?;

            events.emit(LeveragerEvent::Staked {
                user,
                amount,
                loan_amount: outcome.loan_amount,
                scaled_collateral_delta: outcome.delta.collateral,
                scaled_debt_delta: outcome.delta.debt,
                timestamp: inv.timestamp,
            });
            info!(
                amount,
                loan_amount = outcome.loan_amount,
                premium = outcome.premium,
                scaled_collateral = outcome.delta.collateral,
                scaled_debt = outcome.delta.debt,
                "staked"
            );
            Ok(())
        })
    }

    /// Withdraw `amount` of real value from the caller's position
    pub fn unstake(&mut self, inv: Invocation, amount: u128) -> LeveragerResult<()> {
        self.transact("unstake", |this, state, events| {
            if amount == 0 {
                return Err(LeveragerError::InvalidAmount { amount });
            }
            let user = inv.caller;

            this.refresh_into(state, events, inv.timestamp)?;
            state.checkpoint(&user)?;

            let position = state.position(&user);
            let outcome = engine::execute_unloop(
                &mut UnloopContext {
                    config: &this.config,
                    market: this.collab.market.as_ref(),
                    flash: this.collab.flash.as_mut(),
                    vault: this.collab.vault.as_mut(),
                    session: &mut this.session,
                },
                &user,
                &position,
                amount,
            )?;

            let collateral_out = safe_add(amount, outcome.repay_amount)?;
            state.debit(&user, collateral_out, outcome.repay_amount)?;
            state.rebaseline(&user)?;

            events.emit(LeveragerEvent::Unstaked {
                user,
                amount,
                repay_amount: outcome.repay_amount,
                timestamp: inv.timestamp,
            });
            info!(
                amount,
                repay_amount = outcome.repay_amount,
                unstakeable = outcome.unstakeable,
                released_collateral = outcome.released.collateral,
                released_debt = outcome.released.debt,
                "unstaked"
            );
            Ok(())
        })
    }

    // ============ Rewards ============

    /// Fold pending emissions into the global index; returns the reward
    pub fn refresh_rewards(&mut self, inv: Invocation) -> LeveragerResult<u128> {
        self.transact("refresh_rewards", |this, state, events| {
            this.refresh_into(state, events, inv.timestamp)
        })
    }

    /// Turn the caller's pending reward into a vesting claim
    ///
    /// Returns `None` when nothing is pending.
    pub fn claim(&mut self, inv: Invocation) -> LeveragerResult<Option<ClaimId>> {
        self.transact("claim", |this, state, events| {
            let user = inv.caller;

            this.refresh_into(state, events, inv.timestamp)?;
            state.checkpoint(&user)?;
            state.rebaseline(&user)?;

            let amount = state.take_pending(&user);
            if amount == 0 {
                return Ok(None);
            }

            let claim_id = state.next_claim_id()?;
            let unlock_time = inv
                .timestamp
                .checked_add(this.collab.distributor.vest_duration())
                .ok_or(LeveragerError::Overflow)?;
            state.claims.create(claim_id, user, amount, unlock_time)?;

            events.emit(LeveragerEvent::RewardClaimed {
                claim_id,
                beneficiary: user,
                amount,
                unlock_time,
                timestamp: inv.timestamp,
            });
            info!(claim_id, amount, unlock_time, "reward claimed");
            Ok(Some(claim_id))
        })
    }

    /// Pay out a vested claim to its beneficiary
    pub fn settle(&mut self, inv: Invocation, claim_id: ClaimId) -> LeveragerResult<u128> {
        self.transact("settle", |this, state, events| {
            this.settle_one(state, events, claim_id, inv.timestamp)
        })
    }

    /// Settle a batch; any invalid id aborts the whole batch
    pub fn settle_many(&mut self, inv: Invocation, claim_ids: &[ClaimId]) -> LeveragerResult<u128> {
        self.transact("settle_many", |this, state, events| {
            claim_ids.iter().try_fold(0u128, |total, id| {
                let paid = this.settle_one(state, events, *id, inv.timestamp)?;
                safe_add(total, paid)
            })
        })
    }

    fn settle_one(
        &mut self,
        state: &mut LedgerState,
        events: &mut EventLog,
        claim_id: ClaimId,
        now: u64,
    ) -> LeveragerResult<u128> {
        let claim = state.claims.settle(claim_id, now)?;
        self.collab
            .vault
            .withdraw_for_leverager(&claim.beneficiary, claim.amount)?;

        events.emit(LeveragerEvent::ClaimSettled {
            claim_id,
            beneficiary: claim.beneficiary,
            amount: claim.amount,
            timestamp: now,
        });
        info!(claim_id, amount = claim.amount, "claim settled");
        Ok(claim.amount)
    }

    // ============ Admin ============

    /// Change the target leverage ratio (ADMIN role)
    pub fn set_target_leverage_ratio(
        &mut self,
        inv: Invocation,
        ratio: u64,
    ) -> LeveragerResult<()> {
        self.transact("set_target_leverage_ratio", |this, state, events| {
            if !this.collab.access.has_role(&ADMIN, &inv.caller) {
                return Err(LeveragerError::Unauthorized { caller: inv.caller });
            }
            let ltv_bps = this.adapter().ltv_bps();
            validate_ratio(ratio, ltv_bps)?;

            let old_ratio = std::mem::replace(&mut state.target_leverage_ratio, ratio);
            events.emit(LeveragerEvent::LeverageRatioUpdated {
                old_ratio,
                new_ratio: ratio,
                timestamp: inv.timestamp,
            });
            info!(old_ratio, new_ratio = ratio, "target leverage ratio updated");
            Ok(())
        })
    }

    // ============ Views ============

    fn adapter(&self) -> ScaledBalanceAdapter<'_> {
        ScaledBalanceAdapter::new(self.collab.market.as_ref(), self.config.asset)
    }

    pub fn config(&self) -> &LeveragerConfig {
        &self.config
    }

    pub fn pool_state(&self) -> PoolState {
        self.state.pool
    }

    pub fn target_leverage_ratio(&self) -> u64 {
        self.state.target_leverage_ratio
    }

    pub fn position(&self, user: &Address) -> Position {
        self.state.position(user)
    }

    pub fn valuation(&self, user: &Address) -> LeveragerResult<Valuation> {
        self.adapter().valuation(&self.state.position(user))
    }

    pub fn unstakeable(&self, user: &Address) -> LeveragerResult<u128> {
        self.adapter().unstakeable(&self.state.position(user))
    }

    /// Pending reward against the last refreshed index
    pub fn pending_reward(&self, user: &Address) -> LeveragerResult<u128> {
        rewards::preview_pending(&self.state.pool, &self.state.position(user))
    }

    pub fn claim_info(&self, claim_id: ClaimId) -> Option<Claim> {
        self.state.claims.get(claim_id).copied()
    }

    pub fn outstanding_claims(&self, beneficiary: &Address) -> Vec<ClaimId> {
        self.state.claims.outstanding(beneficiary).to_vec()
    }

    pub fn claimable(&self, beneficiary: &Address, now: u64) -> Vec<ClaimId> {
        self.state.claims.claimable(beneficiary, now)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> LeveragerSnapshot {
        LeveragerSnapshot::capture(&self.state)
    }

    pub fn flash_session(&self) -> FlashSession {
        self.session
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }
}

impl FlashLoanReceiver for Leverager {
    /// Out-of-band callbacks land here; they authenticate like in-flight ones
    /// and then find no open request.
    fn execute_operation(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        premium: u128,
        initiator: &Address,
        data: &[u8],
    ) -> LeveragerResult<bool> {
        let mut callback = LoopCallback {
            config: &self.config,
            provider: self.collab.flash.address(),
            market: self.collab.market.as_mut(),
            tokens: self.collab.tokens.as_mut(),
            session: &mut self.session,
        };
        callback.execute_operation(caller, asset, amount, premium, initiator, data)
    }
}
