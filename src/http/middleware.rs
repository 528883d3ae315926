//! Request guards

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::app::AppState;
use crate::http::routes::AppError;

/// Reject joins beyond the configured rate; the registry is never pruned
/// except by explicit disconnects, so this bounds its growth.
pub async fn limit_joins(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.join_limiter.check().is_err() {
        warn!("Join rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
