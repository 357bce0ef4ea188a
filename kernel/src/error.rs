use std::fmt::Display;

use error_stack::Context;

use crate::entity::ReservationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    NotFound,
    Forbidden,
    InvalidTransition,
    DuplicateReservation,
    OutOfOrderFulfillment { first_in_line: ReservationId },
    BookAvailable,
    StorageUnavailable,
    Internal,
}

impl KernelError {
    /// Only storage outages may be retried as-is. Every other kind needs the
    /// caller to change something (e.g. re-read the queue) first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KernelError::StorageUnavailable)
    }
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::NotFound => write!(f, "Resource not found"),
            KernelError::Forbidden => write!(f, "Operation not permitted for this user"),
            KernelError::InvalidTransition => write!(f, "Invalid reservation state transition"),
            KernelError::DuplicateReservation => {
                write!(f, "User already holds an active reservation for this book")
            }
            KernelError::OutOfOrderFulfillment { first_in_line } => write!(
                f,
                "Reservation {} must be fulfilled first",
                first_in_line.as_ref()
            ),
            KernelError::BookAvailable => write!(f, "Book is available for direct borrowing"),
            KernelError::StorageUnavailable => write!(f, "Storage temporarily unavailable"),
            KernelError::Internal => write!(f, "Internal kernel error"),
        }
    }
}

impl Context for KernelError {}
