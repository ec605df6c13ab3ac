use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qrcode::types::QrError;
use thiserror::Error;
use tracing::error;

use clandestine_db::StoreError;
use clandestine_types::api::ErrorResponse;

/// Errors surfaced to clients as `{"error": "..."}` with a matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Invalid admin token. Only the app creator can generate invitations.")]
    AdminRejected,

    #[error("Invalid or unknown invitation")]
    InvitationInvalid,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Not authorized to delete this post")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Failed to generate QR code")]
    Qr(#[from] QrError),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired | ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::AdminRejected | ApiError::InvitationInvalid | ApiError::Forbidden => {
                StatusCode::FORBIDDEN
            }
            ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Qr(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidInput(msg) => ApiError::BadRequest(msg),
            StoreError::InvitationInvalid => ApiError::InvitationInvalid,
            StoreError::UsernameTaken => ApiError::UsernameTaken,
            StoreError::Unauthenticated => ApiError::InvalidSession,
            StoreError::Forbidden => ApiError::Forbidden,
            StoreError::NotFound => ApiError::NotFound("Resource"),
            StoreError::Poisoned => {
                error!("Store failure: snapshot lock poisoned");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Like the `From` conversion, but names what was missing.
pub(crate) fn missing(what: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| match e {
        StoreError::NotFound => ApiError::NotFound(what),
        other => other.into(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
