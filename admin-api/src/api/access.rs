use access_control::{AccessContext, AccessState, Action, Resource, Role};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::CurrentAccess;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_access))
        .route("/check", get(check_permission))
        .route("/link", get(elevated_link))
}

/// Interface tier rendered for a visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceTier {
    Admin,
    Member,
    Student,
    Guest,
}

impl InterfaceTier {
    pub fn for_access(ctx: &AccessContext) -> Self {
        if ctx.should_use_admin_interface() {
            InterfaceTier::Admin
        } else if ctx.role().is_privileged_member() {
            InterfaceTier::Member
        } else if ctx.is_logged_in() {
            InterfaceTier::Student
        } else {
            InterfaceTier::Guest
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessSummary {
    pub logged_in: bool,
    pub role: Role,
    pub role_label: &'static str,
    pub state: AccessState,
    pub interface: InterfaceTier,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub is_member: bool,
    pub admin_interface: bool,
    pub can_manage_elections: bool,
}

impl From<AccessContext> for AccessSummary {
    fn from(ctx: AccessContext) -> Self {
        Self {
            logged_in: ctx.is_logged_in(),
            role: ctx.role(),
            role_label: ctx.role().label(),
            state: ctx.state(),
            interface: InterfaceTier::for_access(&ctx),
            is_admin: ctx.is_admin(),
            is_super_admin: ctx.is_super_admin(),
            is_member: ctx.is_member(),
            admin_interface: ctx.should_use_admin_interface(),
            can_manage_elections: ctx.can_manage_elections(),
        }
    }
}

async fn get_access(CurrentAccess(ctx): CurrentAccess) -> Json<AccessSummary> {
    Json(AccessSummary::from(ctx))
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub action: String,
    pub resource: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub action: Action,
    pub resource: Resource,
    pub role: Role,
    pub allowed: bool,
}

async fn check_permission(
    CurrentAccess(ctx): CurrentAccess,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>> {
    let action: Action = query.action.parse().map_err(AppError::BadRequest)?;
    let resource: Resource = query.resource.parse().map_err(AppError::BadRequest)?;

    Ok(Json(CheckResponse {
        action,
        resource,
        role: ctx.role(),
        allowed: ctx.has_permission(action, resource),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
}

/// Rewrite an in-app link so it carries this request's elevation.
async fn elevated_link(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
    Query(query): Query<LinkQuery>,
) -> Result<Json<LinkResponse>> {
    if !query.url.starts_with('/') || query.url.starts_with("//") {
        return Err(AppError::BadRequest(
            "url must be an absolute in-app path".to_string(),
        ));
    }

    Ok(Json(LinkResponse {
        url: state.pipeline.link(&query.url, &ctx),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_tier() {
        assert_eq!(
            InterfaceTier::for_access(&AccessContext::anonymous()),
            InterfaceTier::Guest
        );
        assert_eq!(
            InterfaceTier::for_access(&AccessContext::new(true, Role::Student, false)),
            InterfaceTier::Student
        );
        assert_eq!(
            InterfaceTier::for_access(&AccessContext::new(true, Role::Finance, false)),
            InterfaceTier::Member
        );
        assert_eq!(
            InterfaceTier::for_access(&AccessContext::new(true, Role::Student, true)),
            InterfaceTier::Admin
        );
        assert_eq!(
            InterfaceTier::for_access(&AccessContext::new(true, Role::Admin, false)),
            InterfaceTier::Admin
        );
    }
}
