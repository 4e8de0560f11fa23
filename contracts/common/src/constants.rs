//! Protocol Constants
//!
//! Fixed-point scales and lending-market conventions used by the leverager.

/// Fixed-point scales
pub mod precision {
    /// Scale of the global reward index (1e20).
    ///
    /// Large enough that `reward * PRECISION / total_scaled_collateral`
    /// loses negligible value to truncation.
    pub const PRECISION: u128 = 100_000_000_000_000_000_000;

    /// Ray fixed-point unit (27 decimals) used by market growth indices
    pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

    /// Half a ray, for round-half-up multiplication
    pub const HALF_RAY: u128 = RAY / 2;
}

/// Leverage ratio configuration
pub mod ratio {
    /// Denominator of the target leverage ratio (parts per million)
    pub const RATIO_DIVISOR: u64 = 1_000_000;

    /// LTV is reported by the market in basis points; one bps is this many ppm
    pub const PPM_PER_BPS: u64 = 100;
}

/// Lending market conventions
pub mod market {
    /// Interest rate mode for variable-rate borrows
    pub const VARIABLE_RATE_MODE: u8 = 2;

    /// Default referral code passed along with flash-loan requests
    pub const DEFAULT_REFERRAL_CODE: u16 = 0;

    /// Reserve configuration: LTV occupies bits 0..16
    pub const LTV_MASK: u128 = 0xFFFF;
}

/// Access-control roles
pub mod roles {
    /// Role allowed to adjust the target leverage ratio
    pub const ADMIN: [u8; 32] = *b"LEVERAGER_ADMIN_ROLE____________";
}
