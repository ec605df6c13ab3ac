use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use clandestine_db::StoreError;
use clandestine_types::api::{
    AckResponse, CreatePostRequest, CreatePostResponse, FeedEntry, FeedResponse, PostResponse,
    StatsResponse,
};

use crate::auth::AppState;
use crate::cleanup;
use crate::error::{ApiError, missing};
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::run_blocking;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.unwrap_or_default();
    let post = run_blocking(&state, move |s| {
        s.db.create_post(user.id, &content, s.clock.now_ms())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            success: true,
            post: PostResponse {
                id: post.id,
                content: post.content,
                username: post.username,
                created_at: post.created_at,
                expires_at: post.expires_at,
            },
        }),
    ))
}

/// Sweeps before reading, so the feed never shows an expired post.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<FeedResponse>, ApiError> {
    let (now, rows) = run_blocking(&state, |s| {
        let now = s.clock.now_ms();
        cleanup::sweep(&s.db, now)?;
        s.db.list_active(now).map(|rows| (now, rows))
    })
    .await?;

    let posts: Vec<FeedEntry> = rows
        .into_iter()
        .map(|row| FeedEntry {
            id: row.id,
            content: row.content,
            username: row.username,
            created_at: row.created_at,
            expires_at: row.expires_at,
            time_remaining: row.expires_at - now,
        })
        .collect();

    Ok(Json(FeedResponse {
        success: true,
        total: posts.len(),
        posts,
    }))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    // Ids are numeric; anything else names no post.
    let post_id: u64 = post_id.parse().map_err(|_| ApiError::NotFound("Post"))?;
    run_blocking(&state, move |s| {
        s.db.delete_post(post_id, user.id).map_err(missing("Post"))
    })
    .await?;

    Ok(Json(AckResponse {
        success: true,
        message: "Post deleted successfully".into(),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    let (active_posts, total_users) = run_blocking(&state, |s| {
        let now = s.clock.now_ms();
        Ok::<_, StoreError>((s.db.active_post_count(now)?, s.db.user_count()?))
    })
    .await?;

    Ok(Json(StatsResponse {
        active_posts,
        total_users,
        expiration_time: "24 hours".into(),
    }))
}
