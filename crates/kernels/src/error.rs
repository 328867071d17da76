/// Error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Start time is not set.
    #[error("must have either startBlock or startTime")]
    MissingStart,
    /// Earn rate does not parse.
    #[error("invalid earn rate")]
    InvalidEarnRate,
    /// Earn rate is negative.
    #[error("earn rate must be non-negative")]
    NegativeRate,
    /// Earn rate is infinite.
    #[error("earn rate cannot be infinite")]
    EarnRateInfinite,
    /// Malformed user address.
    #[error("invalid user address")]
    InvalidUserAddr,
    /// Malformed chain address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Empty source.
    #[error("source cannot be empty")]
    EmptySource,
    /// Empty sub-source.
    #[error("subSource cannot be empty")]
    EmptySubSource,
    /// Empty category.
    #[error("category cannot be empty")]
    EmptyCategory,
    /// Grant amount does not parse.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Grant amount is not positive.
    #[error("amount must be positive")]
    NegativeAmount,
    /// Grant time is not set.
    #[error("grant time must be set")]
    MissingGrantTime,
    /// Empty batch.
    #[error("batch cannot be empty")]
    EmptyBatch,
    /// Batch columns disagree in length or shared fields.
    #[error("batch shape mismatch: {0}")]
    BatchShapeMismatch(&'static str),
    /// Negative start block.
    #[error("start block must be positive")]
    NonPositiveStartBlock,
    /// Non-positive start time.
    #[error("start time must be positive")]
    NonPositiveStartTime,
    /// Negative tier multiplier.
    #[error("multiplier must be non-negative")]
    NegativeMultiplier,
    /// Negative program id.
    #[error("program must be non-negative")]
    NegativeProgram,
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
