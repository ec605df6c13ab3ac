pub mod auth;
pub mod cleanup;
pub mod error;
pub mod extract;
pub mod invite;
pub mod middleware;
pub mod posts;
pub mod qr;
pub mod routes;

use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

pub use routes::router;

/// Run a store call on the blocking pool; saves do file I/O under the store lock.
pub(crate) async fn run_blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(Into::into)
}

/// Treat an absent and an empty field the same way.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
