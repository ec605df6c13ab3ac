use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use clandestine_types::api::{
    GenerateInviteRequest, GenerateInviteResponse, InviteQrResponse, ValidateInviteRequest,
    ValidateInviteResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, missing};
use crate::extract::ApiJson;
use crate::{qr, required, run_blocking};

/// POST /api/invite/generate — admin only. Tokens are reusable.
pub async fn generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateInviteRequest>,
) -> Result<Json<GenerateInviteResponse>, ApiError> {
    if !state.admin_authorized(req.master_token.as_deref()) {
        warn!("Rejected invitation request with a bad master token");
        return Err(ApiError::AdminRejected);
    }

    let token = run_blocking(&state, |s| s.db.create_invite(s.clock.now_ms())).await?;

    let invite_url = qr::invite_url(&state.frontend_url, &token);
    let qr_code = qr::render_data_url(&invite_url)?;
    info!("Invitation created");

    Ok(Json(GenerateInviteResponse {
        success: true,
        invite_token: token,
        invite_url,
        qr_code,
        message: "Reusable QR invitation created. Share this with multiple people.".into(),
        expires_after_use: false,
    }))
}

/// POST /api/invite/validate — first call after a QR code is scanned.
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ValidateInviteRequest>,
) -> Result<Response, ApiError> {
    let token = required(req.token)
        .ok_or_else(|| ApiError::BadRequest("Invitation token required".into()))?;

    let lookup = token.clone();
    match run_blocking(&state, move |s| s.db.validate_invite(&lookup)).await {
        Ok(_) => Ok(Json(ValidateInviteResponse {
            valid: true,
            message: "Invitation is valid".into(),
            token,
        })
        .into_response()),
        Err(ApiError::NotFound(_)) => Ok((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Invalid invitation token", "valid": false })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// GET /api/invite/qr/{token} — re-render the QR code for an existing token.
pub async fn qr_code(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InviteQrResponse>, ApiError> {
    let lookup = token.clone();
    let invite = run_blocking(&state, move |s| {
        s.db.validate_invite(&lookup).map_err(missing("Token"))
    })
    .await?;

    let invite_url = qr::invite_url(&state.frontend_url, &token);
    let qr_code = qr::render_data_url(&invite_url)?;

    Ok(Json(InviteQrResponse {
        success: true,
        qr_code,
        invite_url,
        used: invite.used,
    }))
}
