#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! Reward-accrual request batching and referral-bonus propagation.

/// Address normalization and validation.
pub mod address;

/// Arbitrary-precision rate arithmetic.
pub mod rate;

/// Referral tier rates.
pub mod tier;

/// Earn requests.
pub mod earn;

/// Grant requests.
pub mod grant;

/// Batches of earn requests.
pub mod batch;

/// Batch partitioning.
pub mod factory;

/// Program-scoped wrappers.
pub mod program;

/// Error type.
pub mod error;


pub use batch::{EarnRequestBatch, EarnRequestFullBatch};
pub use earn::EarnRequest;
pub use error::Error;
pub use factory::{make_many_earn_request_batches, make_many_earn_request_full_batches};
pub use grant::GrantRequest;
pub use program::Program;
pub use rate::Decimal;
pub use tier::TierRates;

/// Alias for result.
pub type Result<T> = std::result::Result<T, Error>;

/// Types that can check their own invariants.
pub trait Validate {
    /// Validate, returning the first violated invariant.
    fn validate(&self) -> Result<()>;
}
