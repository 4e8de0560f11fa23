//! Error Types for the Leverager
//!
//! Typed errors with stable string codes, grouped by category so callers can
//! tell user mistakes apart from integrity or arithmetic faults.

use thiserror::Error;

use crate::types::{Address, ClaimId};

/// Result type alias for leverager operations
pub type LeveragerResult<T> = Result<T, LeveragerError>;

/// Main error enum for all leverager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeveragerError {
    // ============ Precondition Errors ============
    /// Zero amount where a positive amount is required
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: u128 },

    /// Target leverage ratio outside [0, RATIO_DIVISOR)
    #[error("invalid leverage ratio: {ratio}")]
    InvalidRatio { ratio: u64 },

    /// Target leverage ratio above the reserve's loan-to-value limit
    #[error("leverage ratio {ratio} exceeds market ltv of {ltv_bps} bps")]
    RatioExceedsLtv { ratio: u64, ltv_bps: u64 },

    /// Caller lacks the required role
    #[error("unauthorized caller")]
    Unauthorized { caller: Address },

    /// A guarded entry point was entered while another was in flight
    #[error("reentrant call")]
    ReentrantCall,

    /// Configuration does not match the supplied collaborators
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    // ============ Solvency Errors ============
    /// Withdrawal exceeds the position's unstakeable amount
    #[error("unstake of {requested} exceeds unstakeable {available}")]
    InvalidUnstake { requested: u128, available: u128 },

    // ============ Integrity Errors ============
    /// Flash-loan callback invoked by someone other than the provider
    #[error("flash callback caller is not the expected provider")]
    CallerNotExpectedProvider { caller: Address },

    /// Flash-loan callback reports an initiator other than the leverager
    #[error("flash callback initiator is not the leverager")]
    InitiatorNotLeverager { initiator: Address },

    /// Flash-loan callback arrived without a matching open request
    #[error("unexpected flash callback")]
    UnexpectedFlashCallback,

    /// Provider returned without invoking the callback
    #[error("flash loan was not fulfilled")]
    FlashLoanNotFulfilled,

    /// Callback payload could not be decoded
    #[error("invalid flash callback data")]
    InvalidCallbackData,

    // ============ Arithmetic Errors ============
    /// Ray multiplication would overflow
    #[error("ray multiplication overflow: {scaled} * {index}")]
    RayMulOverflow { scaled: u128, index: u128 },

    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    // ============ Claim Errors ============
    /// Claim cannot be settled
    #[error("invalid claim {claim_id}: {reason:?}")]
    InvalidClaim {
        claim_id: ClaimId,
        reason: ClaimErrorReason,
    },

    // ============ External Errors ============
    /// An external collaborator refused the request
    #[error("external call failed: {reason}")]
    ExternalCallFailed { reason: &'static str },
}

/// Why a claim could not be settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimErrorReason {
    /// No claim with this id was ever created
    NotFound,
    /// Claim was already settled
    AlreadySettled,
    /// Unlock time has not been reached
    StillVesting { unlock_time: u64, now: u64 },
    /// Claim id is missing from the beneficiary's outstanding set
    NotOutstanding,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Solvency,
    Integrity,
    Arithmetic,
    ClaimState,
    External,
}

impl LeveragerError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidRatio { .. } => "INVALID_RATIO",
            Self::RatioExceedsLtv { .. } => "RATIO_EXCEEDS_LTV",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::ReentrantCall => "REENTRANT_CALL",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::InvalidUnstake { .. } => "INVALID_UNSTAKE",
            Self::CallerNotExpectedProvider { .. } => "CALLER_NOT_EXPECTED_PROVIDER",
            Self::InitiatorNotLeverager { .. } => "INITIATOR_NOT_LEVERAGER",
            Self::UnexpectedFlashCallback => "UNEXPECTED_FLASH_CALLBACK",
            Self::FlashLoanNotFulfilled => "FLASH_LOAN_NOT_FULFILLED",
            Self::InvalidCallbackData => "INVALID_CALLBACK_DATA",
            Self::RayMulOverflow { .. } => "RAY_MUL_OVERFLOW",
            Self::Overflow => "OVERFLOW",
            Self::Underflow => "UNDERFLOW",
            Self::DivisionByZero => "DIVISION_BY_ZERO",
            Self::InvalidClaim { .. } => "INVALID_CLAIM",
            Self::ExternalCallFailed { .. } => "EXTERNAL_CALL_FAILED",
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidRatio { .. }
            | Self::RatioExceedsLtv { .. }
            | Self::Unauthorized { .. }
            | Self::ReentrantCall
            | Self::InvalidConfig { .. } => ErrorKind::Precondition,
            Self::InvalidUnstake { .. } => ErrorKind::Solvency,
            Self::CallerNotExpectedProvider { .. }
            | Self::InitiatorNotLeverager { .. }
            | Self::UnexpectedFlashCallback
            | Self::FlashLoanNotFulfilled
            | Self::InvalidCallbackData => ErrorKind::Integrity,
            Self::RayMulOverflow { .. }
            | Self::Overflow
            | Self::Underflow
            | Self::DivisionByZero => ErrorKind::Arithmetic,
            Self::InvalidClaim { .. } => ErrorKind::ClaimState,
            Self::ExternalCallFailed { .. } => ErrorKind::External,
        }
    }

    /// Arithmetic faults mean balances or indices left their designed bounds
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Arithmetic
    }

    /// Returns true if the caller can fix the request and resubmit
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidAmount { .. } => true,
            Self::InvalidUnstake { .. } => true, // Withdraw less
            Self::InvalidClaim {
                reason: ClaimErrorReason::StillVesting { .. },
                ..
            } => true, // Wait for unlock
            Self::ReentrantCall => true,
            _ => false,
        }
    }
}
