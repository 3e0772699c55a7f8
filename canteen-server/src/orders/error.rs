//! Order domain errors

use shared::order::InvalidTransition;
use thiserror::Error;

use super::storage::StorageError;
use crate::utils::AppError;

/// Order domain errors
#[derive(Debug, Error)]
pub enum OrderError {
    /// Bad input; rejected before any storage access, never retried
    #[error("validation failed: {0}")]
    Validation(String),

    /// Canteen missing or not accepting orders; a business-state
    /// rejection, not retried
    #[error("canteen unavailable: {0}")]
    CanteenUnavailable(String),

    /// Allocation kept conflicting past the bounded retry budget. The
    /// caller may retry once more with the same request id.
    #[error("token allocation for canteen {canteen_id} failed after {attempts} attempts")]
    TokenAllocation {
        canteen_id: String,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// Unknown order or canteen id
    #[error("{0}")]
    NotFound(String),

    /// Transition outside the status machine
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Underlying storage failure
    #[error(transparent)]
    Storage(StorageError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<StorageError> for OrderError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::OrderNotFound(id) => OrderError::NotFound(format!("Order {id} not found")),
            other => OrderError::Storage(other),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Validation(msg) => AppError::Validation(msg),
            OrderError::CanteenUnavailable(msg) => AppError::CanteenUnavailable(msg),
            OrderError::TokenAllocation {
                canteen_id,
                attempts,
                ..
            } => AppError::TokenAllocation(format!(
                "token allocation for canteen {canteen_id} failed after {attempts} attempts"
            )),
            OrderError::NotFound(msg) => AppError::NotFound(msg),
            OrderError::InvalidTransition(t) => AppError::InvalidTransition(t),
            OrderError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}
