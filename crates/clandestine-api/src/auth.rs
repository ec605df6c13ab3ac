use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::info;

use clandestine_db::{Clock, Database};
use clandestine_types::api::{
    AckResponse, SessionRequest, SessionUser, SignupRequest, SignupResponse, UserSummary,
    VerifyResponse,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{required, run_blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub clock: Arc<dyn Clock>,
    /// Shared secret for creating invitations. `None` disables generation.
    pub master_token: Option<String>,
    /// Base URL that invitation links point at.
    pub frontend_url: String,
}

impl AppStateInner {
    /// Exact-match check of the admin secret. Both sides are hashed first so
    /// the comparison never short-circuits on a prefix of the secret.
    pub fn admin_authorized(&self, given: Option<&str>) -> bool {
        match (self.master_token.as_deref(), given) {
            (Some(expected), Some(given)) => {
                Sha256::digest(expected.as_bytes()) == Sha256::digest(given.as_bytes())
            }
            _ => false,
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(invite_token)) = (required(req.username), required(req.invite_token))
    else {
        return Err(ApiError::BadRequest(
            "Username and invitation token required".into(),
        ));
    };

    let user = run_blocking(&state, move |s| {
        s.db.create_account(&username, &invite_token, s.clock.now_ms())
    })
    .await?;

    let session_token = user.session_token.ok_or(ApiError::Internal)?;
    info!(user_id = user.id, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "Account created successfully".into(),
            user: UserSummary {
                id: user.id,
                username: user.username,
            },
            session_token,
        }),
    ))
}

pub async fn verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SessionRequest>,
) -> Result<Response, ApiError> {
    let token = required(req.session_token)
        .ok_or_else(|| ApiError::BadRequest("Session token required".into()))?;

    match run_blocking(&state, move |s| s.db.verify_session(&token)).await {
        Ok(user) => Ok(Json(VerifyResponse {
            authenticated: true,
            user: SessionUser {
                id: user.id,
                username: user.username,
                member_since: user.created_at,
            },
        })
        .into_response()),
        Err(ApiError::InvalidSession) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Invalid session", "authenticated": false })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// Clears the session if one was given. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SessionRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    if let Some(token) = required(req.session_token) {
        run_blocking(&state, move |s| s.db.clear_session(&token)).await?;
    }

    Ok(Json(AckResponse {
        success: true,
        message: "Logged out successfully".into(),
    }))
}
