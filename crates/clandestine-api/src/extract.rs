use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json`, but a rejected body renders as `{"error": "..."}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
