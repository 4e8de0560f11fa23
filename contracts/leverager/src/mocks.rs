//! In-memory collaborators for tests
//!
//! Every mock shares one `World`. Mocks drop their borrow of it before
//! calling back into another collaborator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use leverager_common::{
    constants::precision::RAY,
    errors::{LeveragerError, LeveragerResult},
    math::mul_div,
    types::{Address, ReserveTokens},
};

use crate::config::LeveragerConfig;
use crate::engine::FlashParams;
use crate::interfaces::{
    AccessControl, Collaborators, FlashLoanProvider, FlashLoanReceiver, IncentiveController,
    LendingMarket, SharedVault, TokenLedger, VestingDistributor,
};
use crate::leverager::Leverager;

pub const LEVERAGER: Address = [0xAA; 32];
pub const ASSET: Address = [0xA5; 32];
pub const VAULT: Address = [0x5A; 32];
pub const PROVIDER: Address = [0xF1; 32];
pub const COLLATERAL_TOKEN: Address = [0xC0; 32];
pub const DEBT_TOKEN: Address = [0xD0; 32];
pub const ADMIN_ACCOUNT: Address = [0xAD; 32];
pub const INTRUDER: Address = [0xEE; 32];
pub const ALICE: Address = [1u8; 32];
pub const BOB: Address = [2u8; 32];

pub type SharedWorld = Rc<RefCell<World>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCall {
    pub receiver: Address,
    pub amount: u128,
    pub premium: u128,
    pub referral_code: u16,
}

#[derive(Debug)]
pub struct World {
    pub income_index: u128,
    pub debt_index: u128,
    pub ltv_bps: u128,
    pub liquidation_threshold_bps: u128,
    /// Scaled balances keyed by (token, holder)
    pub scaled: HashMap<(Address, Address), u128>,
    /// Base-asset balances
    pub balances: HashMap<Address, u128>,
    /// Base-asset allowances keyed by (owner, spender)
    pub allowances: HashMap<(Address, Address), u128>,
    /// Unclaimed emissions per incentivized token
    pub pending_rewards: HashMap<Address, u128>,
    pub vest_duration: u64,
    pub premium_bps: u128,
    pub admins: Vec<Address>,
    pub payouts: Vec<(Address, u128)>,
    pub unwinds: Vec<(Address, u128)>,
    pub flash_calls: Vec<FlashCall>,
    pub skip_callback: bool,
    pub spoof_caller: bool,
    pub spoof_initiator: bool,
    pub refuse_payout: bool,
}

impl Default for World {
    fn default() -> Self {
        Self {
            income_index: RAY,
            debt_index: RAY,
            ltv_bps: 8_000,
            liquidation_threshold_bps: 8_500,
            scaled: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            pending_rewards: HashMap::new(),
            vest_duration: 100,
            premium_bps: 0,
            admins: vec![ADMIN_ACCOUNT],
            payouts: Vec::new(),
            unwinds: Vec::new(),
            flash_calls: Vec::new(),
            skip_callback: false,
            spoof_caller: false,
            spoof_initiator: false,
            refuse_payout: false,
        }
    }
}

impl World {
    pub fn fund(&mut self, holder: &Address, amount: u128) {
        *self.balances.entry(*holder).or_default() += amount;
    }

    /// Queue emissions for the shared vault's collateral token
    pub fn add_reward(&mut self, amount: u128) {
        *self.pending_rewards.entry(COLLATERAL_TOKEN).or_default() += amount;
    }

    pub fn scaled_of(&self, token: &Address, holder: &Address) -> u128 {
        self.scaled.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    fn add_scaled(&mut self, token: Address, holder: Address, amount: u128, index: u128) {
        let scaled = mul_div(amount, RAY, index).expect("scaled amount fits u128");
        *self.scaled.entry((token, holder)).or_default() += scaled;
    }

    fn sub_scaled(&mut self, token: Address, holder: Address, amount: u128) {
        let entry = self.scaled.entry((token, holder)).or_default();
        *entry = entry.saturating_sub(amount);
    }
}

// ============ Lending Market ============

pub struct MockMarket {
    world: SharedWorld,
}

impl LendingMarket for MockMarket {
    fn deposit(
        &mut self,
        asset: &Address,
        amount: u128,
        on_behalf_of: &Address,
    ) -> LeveragerResult<()> {
        assert_eq!(*asset, ASSET);
        let mut w = self.world.borrow_mut();
        let index = w.income_index;
        w.add_scaled(COLLATERAL_TOKEN, *on_behalf_of, amount, index);
        Ok(())
    }

    fn borrow(
        &mut self,
        asset: &Address,
        amount: u128,
        rate_mode: u8,
        on_behalf_of: &Address,
    ) -> LeveragerResult<()> {
        assert_eq!(*asset, ASSET);
        assert_eq!(rate_mode, 2);
        let mut w = self.world.borrow_mut();
        let index = w.debt_index;
        w.add_scaled(DEBT_TOKEN, *on_behalf_of, amount, index);
        Ok(())
    }

    fn reserve_tokens(&self, asset: &Address) -> LeveragerResult<ReserveTokens> {
        if *asset != ASSET {
            return Err(LeveragerError::ExternalCallFailed {
                reason: "unknown reserve",
            });
        }
        Ok(ReserveTokens {
            collateral_token: COLLATERAL_TOKEN,
            variable_debt_token: DEBT_TOKEN,
        })
    }

    fn normalized_income(&self, _asset: &Address) -> u128 {
        self.world.borrow().income_index
    }

    fn normalized_variable_debt(&self, _asset: &Address) -> u128 {
        self.world.borrow().debt_index
    }

    fn configuration(&self, _asset: &Address) -> u128 {
        let w = self.world.borrow();
        // liquidation threshold sits above the LTV bits
        w.ltv_bps | (w.liquidation_threshold_bps << 16)
    }

    fn scaled_balance_of(&self, token: &Address, holder: &Address) -> u128 {
        self.world.borrow().scaled_of(token, holder)
    }
}

// ============ Token Ledger ============

pub struct MockTokens {
    world: SharedWorld,
}

impl TokenLedger for MockTokens {
    fn transfer_from(
        &mut self,
        _asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LeveragerResult<()> {
        let mut w = self.world.borrow_mut();
        let balance = w.balances.entry(*from).or_default();
        if *balance < amount {
            return Err(LeveragerError::ExternalCallFailed {
                reason: "insufficient balance",
            });
        }
        *balance -= amount;
        *w.balances.entry(*to).or_default() += amount;
        Ok(())
    }

    fn approve(
        &mut self,
        _asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> LeveragerResult<()> {
        self.world
            .borrow_mut()
            .allowances
            .insert((*owner, *spender), amount);
        Ok(())
    }
}

// ============ Flash Loan Provider ============

pub struct MockFlashProvider {
    world: SharedWorld,
}

impl FlashLoanProvider for MockFlashProvider {
    fn address(&self) -> Address {
        PROVIDER
    }

    fn flash_loan_simple(
        &mut self,
        initiator: &Address,
        receiver: &mut dyn FlashLoanReceiver,
        receiver_address: &Address,
        asset: &Address,
        amount: u128,
        data: &[u8],
        referral_code: u16,
    ) -> LeveragerResult<()> {
        let (caller, reported_initiator, premium, skip) = {
            let mut w = self.world.borrow_mut();
            let premium = amount * w.premium_bps / 10_000;
            w.flash_calls.push(FlashCall {
                receiver: *receiver_address,
                amount,
                premium,
                referral_code,
            });
            let caller = if w.spoof_caller { INTRUDER } else { PROVIDER };
            let reported = if w.spoof_initiator { INTRUDER } else { *initiator };
            (caller, reported, premium, w.skip_callback)
        };
        if skip {
            return Ok(());
        }

        let accepted =
            receiver.execute_operation(&caller, asset, amount, premium, &reported_initiator, data)?;
        if !accepted {
            return Err(LeveragerError::ExternalCallFailed {
                reason: "flash receiver declined",
            });
        }

        let mut w = self.world.borrow_mut();
        let allowance = w.allowances.entry((*receiver_address, PROVIDER)).or_default();
        let owed = amount + premium;
        if *allowance < owed {
            return Err(LeveragerError::ExternalCallFailed {
                reason: "flash loan not repaid",
            });
        }
        *allowance -= owed;
        Ok(())
    }
}

// ============ Incentives, Vesting, Access ============

pub struct MockIncentives {
    world: SharedWorld,
}

impl IncentiveController for MockIncentives {
    fn pending_rewards(&self, holder: &Address, tokens: &[Address]) -> Vec<u128> {
        let w = self.world.borrow();
        tokens
            .iter()
            .map(|token| {
                if *holder == VAULT {
                    w.pending_rewards.get(token).copied().unwrap_or(0)
                } else {
                    0
                }
            })
            .collect()
    }

    fn claim(&mut self, holder: &Address, tokens: &[Address]) -> LeveragerResult<u128> {
        if *holder != VAULT {
            return Ok(0);
        }
        let mut w = self.world.borrow_mut();
        Ok(tokens
            .iter()
            .map(|token| w.pending_rewards.remove(token).unwrap_or(0))
            .sum())
    }
}

pub struct MockDistributor {
    world: SharedWorld,
}

impl VestingDistributor for MockDistributor {
    fn vest_duration(&self) -> u64 {
        self.world.borrow().vest_duration
    }
}

pub struct MockAccess {
    world: SharedWorld,
}

impl AccessControl for MockAccess {
    fn has_role(&self, _role: &[u8; 32], account: &Address) -> bool {
        self.world.borrow().admins.contains(account)
    }
}

// ============ Shared Vault ============

pub struct MockVault {
    world: SharedWorld,
    address: Address,
}

impl SharedVault for MockVault {
    fn address(&self) -> Address {
        self.address
    }

    fn withdraw_for_leverager(
        &mut self,
        beneficiary: &Address,
        amount: u128,
    ) -> LeveragerResult<()> {
        let mut w = self.world.borrow_mut();
        if w.refuse_payout {
            return Err(LeveragerError::ExternalCallFailed {
                reason: "vault refused payout",
            });
        }
        w.payouts.push((*beneficiary, amount));
        Ok(())
    }

    fn receiver(&mut self) -> &mut dyn FlashLoanReceiver {
        self
    }
}

/// Unwind: repay the flash-loaned debt, release collateral, pay the user
impl FlashLoanReceiver for MockVault {
    fn execute_operation(
        &mut self,
        caller: &Address,
        _asset: &Address,
        amount: u128,
        premium: u128,
        _initiator: &Address,
        data: &[u8],
    ) -> LeveragerResult<bool> {
        if *caller != PROVIDER {
            return Err(LeveragerError::CallerNotExpectedProvider { caller: *caller });
        }
        let FlashParams::Unloop { withdraw_amount, user } = FlashParams::decode(data)? else {
            return Err(LeveragerError::InvalidCallbackData);
        };

        let mut w = self.world.borrow_mut();
        w.sub_scaled(DEBT_TOKEN, self.address, amount);
        w.sub_scaled(COLLATERAL_TOKEN, self.address, withdraw_amount + amount);
        w.unwinds.push((user, withdraw_amount));
        w.allowances.insert((self.address, PROVIDER), amount + premium);
        Ok(true)
    }
}

// ============ Setup ============

pub fn config(ratio: u64) -> LeveragerConfig {
    LeveragerConfig::new(LEVERAGER, ASSET, VAULT, ratio)
}

pub fn collaborators(world: &SharedWorld) -> Collaborators {
    Collaborators {
        market: Box::new(MockMarket { world: world.clone() }),
        tokens: Box::new(MockTokens { world: world.clone() }),
        flash: Box::new(MockFlashProvider { world: world.clone() }),
        incentives: Box::new(MockIncentives { world: world.clone() }),
        distributor: Box::new(MockDistributor { world: world.clone() }),
        vault: Box::new(MockVault {
            world: world.clone(),
            address: VAULT,
        }),
        access: Box::new(MockAccess { world: world.clone() }),
    }
}

/// Fresh world plus a leverager targeting `ratio`
pub fn setup(ratio: u64) -> (SharedWorld, Leverager) {
    let world = SharedWorld::default();
    let leverager = Leverager::new(config(ratio), collaborators(&world)).unwrap();
    (world, leverager)
}
