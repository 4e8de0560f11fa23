//! Leverager Common Library
//!
//! Shared types, constants, fixed-point math and events for the leverager
//! engine. Everything here is pure: no collaborator calls, no state beyond
//! the values passed in.
//!
//! - **Constants**: reward index precision, ray unit, ratio divisor
//! - **Errors**: categorized error enum with stable codes
//! - **Math**: checked ray multiplication and proportional helpers
//! - **Events**: indexable events with borsh encoding

pub mod constants;
pub mod errors;
pub mod events;
pub mod math;
pub mod types;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use events::*;
pub use math::*;
pub use types::*;
