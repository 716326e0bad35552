use access_control::{Role, UserId, UserStatus};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::SessionHandle;
use crate::AppState;

pub const UPSTREAM_SECRET_HEADER: &str = "x-upstream-secret";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(establish_session))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct EstablishSessionRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct EstablishSessionResponse {
    pub user_id: i64,
    pub role: Role,
}

/// Record a login verified by the login page.
///
/// Credentials are checked upstream; this endpoint only trusts callers that
/// present the configured upstream secret.
async fn establish_session(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    headers: HeaderMap,
    Json(payload): Json<EstablishSessionRequest>,
) -> Result<Json<EstablishSessionResponse>> {
    let presented = headers
        .get(UPSTREAM_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    if presented != state.config.auth.upstream_secret {
        tracing::warn!("Session establishment with invalid upstream secret");
        return Err(AppError::Unauthorized);
    }

    let user = state
        .pipeline
        .directory()
        .find_user(UserId(payload.user_id))
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?
        .ok_or(AppError::Unauthorized)?;

    if user.status != UserStatus::Active {
        tracing::info!(
            user_id = %user.id,
            status = ?user.status,
            "Login refused for inactive account"
        );
        return Err(AppError::Unauthorized);
    }

    let mut session = handle.session().lock().await;
    session.establish_login(user.id, user.role);
    tracing::info!(user_id = %user.id, role = %user.role, "Session established");

    Ok(Json(EstablishSessionResponse {
        user_id: user.id.0,
        role: user.role,
    }))
}

async fn logout(Extension(handle): Extension<SessionHandle>) -> Json<serde_json::Value> {
    handle.end();
    Json(serde_json::json!({ "message": "Logged out successfully" }))
}
