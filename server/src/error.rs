use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use error_stack::Report;
use kernel::KernelError;
use serde::Serialize;
use std::process::{ExitCode, Termination};
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug)]
pub struct StackTrace(Report<KernelError>);

impl From<Report<KernelError>> for StackTrace {
    fn from(e: Report<KernelError>) -> Self {
        StackTrace(e)
    }
}

impl Termination for StackTrace {
    fn report(self) -> ExitCode {
        self.0.report()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_in_line: Option<Uuid>,
}

#[derive(Debug)]
pub struct ErrorStatus(Report<KernelError>);

impl From<Report<KernelError>> for ErrorStatus {
    fn from(e: Report<KernelError>) -> Self {
        ErrorStatus(e)
    }
}

fn classify(error: &KernelError) -> (StatusCode, &'static str) {
    match error {
        KernelError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        KernelError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        KernelError::InvalidTransition => (StatusCode::CONFLICT, "invalid_transition"),
        KernelError::DuplicateReservation => (StatusCode::CONFLICT, "duplicate_reservation"),
        KernelError::OutOfOrderFulfillment { .. } => {
            (StatusCode::CONFLICT, "out_of_order_fulfillment")
        }
        KernelError::BookAvailable => (StatusCode::CONFLICT, "book_available"),
        KernelError::StorageUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
        }
        KernelError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl IntoResponse for ErrorStatus {
    fn into_response(self) -> axum::response::Response {
        let context = self.0.current_context();
        let (status, error) = classify(context);
        if status.is_server_error() {
            error!("{:?}", self.0);
        } else {
            debug!("{:?}", self.0);
        }
        let first_in_line = match context {
            KernelError::OutOfOrderFulfillment { first_in_line } => Some(*first_in_line.as_ref()),
            _ => None,
        };
        let body = ErrorBody {
            error,
            message: context.to_string(),
            first_in_line,
        };
        (status, Json(body)).into_response()
    }
}
