// ⚠️ Engine Errors - One taxonomy for every engine operation
//
// Precondition failures (insufficient funds, out of stock, already attempted,
// no target, not found) are detected BEFORE any mutation and are always safe
// to surface directly to the end user. PartialFailure means a multi-step
// sequence stopped after some writes succeeded - the engine never rolls back,
// it reports what completed so the caller can reconcile.

use thiserror::Error;

use crate::model::SeatStatus;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Attempted debit exceeds the available balance. No mutation performed.
    #[error("insufficient funds: balance {balance}, attempted debit {amount}")]
    InsufficientFunds { balance: i64, amount: i64 },

    /// Finite-stock item is exhausted. No mutation performed.
    #[error("item out of stock: {0}")]
    OutOfStock(String),

    /// A quiz attempt already exists for this (student, quiz, date).
    /// First attempt is final - no retry within the same day.
    #[error("quiz {quiz_id} already attempted by {student_id} on {date}")]
    AlreadyAttempted {
        student_id: String,
        quiz_id: String,
        date: String,
    },

    /// Bulk operation invoked with an empty target set.
    #[error("bulk operation has no targets")]
    NoTarget,

    /// Referenced participant/item/seat/quiz/session does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Amounts moved by the engine must be strictly positive.
    #[error("invalid amount: {0} (must be > 0)")]
    InvalidAmount(i64),

    /// Seat is not in the state the requested transition starts from.
    #[error("seat {seat_id} is {found}, expected {expected}")]
    WrongSeatState {
        seat_id: String,
        expected: &'static str,
        found: SeatStatus,
    },

    /// Generated quiz content failed validation; nothing was persisted.
    #[error("generated content rejected: {0}")]
    InvalidContent(String),

    /// A multi-step operation completed some writes before a later step
    /// failed. Reported, never silently swallowed; the caller decides
    /// whether to retry the remaining step or flag for reconciliation.
    #[error("partial failure in {operation}: completed [{completed}], failed at {failed_step}: {detail}")]
    PartialFailure {
        operation: &'static str,
        completed: String,
        failed_step: &'static str,
        detail: String,
    },

    /// Underlying record-store error.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Stored JSON column failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Build a PartialFailure from the list of steps that did complete.
    pub fn partial(
        operation: &'static str,
        completed: &[&str],
        failed_step: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        EngineError::PartialFailure {
            operation,
            completed: completed.join(", "),
            failed_step,
            detail: detail.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: &str) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
