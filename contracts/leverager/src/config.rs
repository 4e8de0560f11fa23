//! Leverager Configuration

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use leverager_common::{
    constants::{
        market::DEFAULT_REFERRAL_CODE,
        ratio::{PPM_PER_BPS, RATIO_DIVISOR},
    },
    errors::{LeveragerError, LeveragerResult},
    types::{Address, ZERO_ADDRESS},
};

/// Deployment parameters of a leverager instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LeveragerConfig {
    /// The engine's own address (flash-loan initiator and receiver)
    pub leverager: Address,
    /// Base asset deposited, borrowed and flash-loaned
    pub asset: Address,
    /// Holder of the pooled market position
    pub shared_vault: Address,
    /// Target leverage ratio in parts per million
    pub target_leverage_ratio: u64,
    /// Referral code forwarded with flash-loan requests
    #[serde(default = "default_referral_code")]
    pub referral_code: u16,
}

fn default_referral_code() -> u16 {
    DEFAULT_REFERRAL_CODE
}

impl LeveragerConfig {
    pub fn new(
        leverager: Address,
        asset: Address,
        shared_vault: Address,
        target_leverage_ratio: u64,
    ) -> Self {
        Self {
            leverager,
            asset,
            shared_vault,
            target_leverage_ratio,
            referral_code: DEFAULT_REFERRAL_CODE,
        }
    }

    /// Check addresses and the ratio against the reserve's LTV
    pub fn validate(&self, ltv_bps: u64) -> LeveragerResult<()> {
        if self.leverager == ZERO_ADDRESS {
            return Err(LeveragerError::InvalidConfig {
                reason: "leverager cannot be zero address",
            });
        }
        if self.asset == ZERO_ADDRESS {
            return Err(LeveragerError::InvalidConfig {
                reason: "asset cannot be zero address",
            });
        }
        if self.shared_vault == ZERO_ADDRESS {
            return Err(LeveragerError::InvalidConfig {
                reason: "shared_vault cannot be zero address",
            });
        }
        validate_ratio(self.target_leverage_ratio, ltv_bps)
    }
}

/// A ratio must stay below `RATIO_DIVISOR` and within the market LTV
pub fn validate_ratio(ratio: u64, ltv_bps: u64) -> LeveragerResult<()> {
    if ratio >= RATIO_DIVISOR {
        return Err(LeveragerError::InvalidRatio { ratio });
    }
    if ratio > ltv_bps.saturating_mul(PPM_PER_BPS) {
        return Err(LeveragerError::RatioExceedsLtv { ratio, ltv_bps });
    }
    Ok(())
}
