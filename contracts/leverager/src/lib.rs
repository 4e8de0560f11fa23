//! Leverager - Leveraged Position Accounting Engine
//!
//! Participants deposit a base asset; the leverager supplies it to an
//! external lending market on behalf of a shared vault and borrows against
//! it, bootstrapping the loop with a flash loan. Each participant owns a
//! proportional share of the vault's scaled collateral and debt, and earns a
//! share of the market's reward emissions through vesting claims.
//!
//! ## Core Operations
//!
//! - **Stake**: deposit and loop up to the target leverage ratio
//! - **Unstake**: unloop through the shared vault and withdraw
//! - **Claim**: convert accrued reward into a time-locked claim
//! - **Settle**: pay out a vested claim
//!
//! ## Modules
//!
//! - [`market`]: scaled-balance adapter over the lending market
//! - [`rewards`]: global reward index, checkpoint and rebaseline
//! - [`engine`]: loop/unloop flash-loan protocol
//! - [`ledger`]: per-participant positions and pool totals
//! - [`claims`]: vesting claim queue
//! - [`leverager`]: guarded public entry points
//!
//! Collaborators (market, flash provider, incentives, vault, access control)
//! are consumed through the traits in [`interfaces`].

pub mod claims;
pub mod config;
pub mod engine;
pub mod interfaces;
pub mod ledger;
pub mod leverager;
pub mod market;
pub mod rewards;
pub mod snapshot;

#[cfg(test)]
mod mocks;


pub use config::LeveragerConfig;
pub use engine::{FlashParams, FlashSession};
pub use interfaces::*;
pub use leverager::{Invocation, Leverager};
pub use snapshot::LeveragerSnapshot;

pub use leverager_common::{
    Address, Claim, ClaimId, EventLog, LeveragerError, LeveragerEvent, LeveragerResult, Position,
};
