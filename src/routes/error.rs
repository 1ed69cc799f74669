use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::InvalidInput;
use crate::subscription_service::{error_chain_fmt, SubscriptionError};

pub const DUPLICATE_SUBSCRIBER_MESSAGE: &str =
    "This email address is already subscribed to our newsletter.";
pub const CONFIGURATION_MESSAGE: &str =
    "Newsletter service is not available right now. Please contact support.";
pub const UNEXPECTED_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Every failure answers with `{ "error": "..." }`.
#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("{}", DUPLICATE_SUBSCRIBER_MESSAGE)]
    DuplicateSubscriber,
    #[error("{}", CONFIGURATION_MESSAGE)]
    Configuration(#[source] SubscriptionError),
    // Upstream messages are logged, never returned.
    #[error("{}", UNEXPECTED_MESSAGE)]
    Unexpected(#[source] SubscriptionError),
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::DuplicateSubscriber => ApiError::DuplicateSubscriber,
            SubscriptionError::Configuration(_) => ApiError::Configuration(err),
            SubscriptionError::Store(_) => ApiError::Unexpected(err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateSubscriber => StatusCode::CONFLICT,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!("{:?}", self);
        }

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: &self.to_string(),
        })
    }
}
