//! HTTP translation of leave engine errors.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::leave::error::LeaveError;

#[derive(Debug, Display)]
#[display(fmt = "{}", _0)]
pub struct ApiError(pub LeaveError);

impl From<LeaveError> for ApiError {
    fn from(err: LeaveError) -> Self {
        ApiError(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            LeaveError::InvalidInput | LeaveError::NoWorkingDays => StatusCode::BAD_REQUEST,
            LeaveError::Forbidden => StatusCode::FORBIDDEN,
            LeaveError::NotFound | LeaveError::TypeNotFound => StatusCode::NOT_FOUND,
            LeaveError::LockedDate
            | LeaveError::OverlapApproved
            | LeaveError::InvalidStatusTransition
            | LeaveError::Conflict => StatusCode::CONFLICT,
            LeaveError::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.0.is_policy() {
            self.0.to_string()
        } else {
            // detail stays in the log
            error!(error = %self.0, "Leave request failed");
            "Internal Server Error".to_string()
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
