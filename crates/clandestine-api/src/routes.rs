use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};

use clandestine_types::api::HealthResponse;

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::{require_session, security_headers};
use crate::{invite, posts};

/// All `/api` routes. CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/invite/generate", post(invite::generate))
        .route("/api/invite/validate", post(invite::validate))
        .route("/api/invite/qr/{token}", get(invite::qr_code))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/stats", get(posts::stats))
        .route("/api/posts/{post_id}", delete(posts::delete_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "operational".into(),
        message: "Clandestine backend running".into(),
    })
}

async fn endpoint_not_found() -> ApiError {
    ApiError::NotFound("Endpoint")
}
