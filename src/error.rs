use rust_decimal::Decimal;
use thiserror::Error;

use crate::entry::CustomerId;

/// Failure taxonomy of the leaderboard core. All variants are detected
/// before any mutation, so a returned error implies unchanged state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("score delta {delta} outside the allowed range [-1000, 1000]")]
    DeltaOutOfRange { delta: Decimal },

    #[error("invalid rank range: start {start}, end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("customer {id} is not ranked")]
    NotFound { id: CustomerId },
}
