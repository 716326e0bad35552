//! Interface-tier entry points
//!
//! Page rendering lives elsewhere; these routes hand the renderer the tier
//! and navigation it is allowed to show. Links carry the request's
//! elevation so it survives navigation.

use access_control::{AccessContext, Action, Resource};
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;

use super::access::InterfaceTier;
use crate::middleware::{
    require_admin_interface, require_admin_or_member, require_election_manager, require_login,
    CurrentAccess,
};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/admin", get(admin_interface))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_interface,
        ));

    let shared = Router::new()
        .route("/shared", get(shared_interface))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_or_member,
        ));

    let elections = Router::new()
        .route("/elections/manage", get(manage_elections))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_election_manager,
        ));

    let home = Router::new()
        .route("/home", get(home))
        .route_layer(middleware::from_fn_with_state(state, require_login));

    Router::new()
        .merge(admin)
        .merge(shared)
        .merge(elections)
        .merge(home)
}

#[derive(Debug, Serialize)]
pub struct NavLink {
    pub resource: Resource,
    pub href: String,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct InterfaceView {
    pub interface: InterfaceTier,
    pub role_label: &'static str,
    pub navigation: Vec<NavLink>,
}

fn view(state: &AppState, ctx: &AccessContext) -> InterfaceView {
    let navigation = Resource::ALL
        .into_iter()
        .filter(|resource| ctx.has_permission(Action::Read, *resource))
        .map(|resource| NavLink {
            resource,
            href: state
                .pipeline
                .link(&format!("/{}", resource.as_str()), ctx),
            can_edit: ctx.has_permission(Action::Update, resource),
        })
        .collect();

    InterfaceView {
        interface: InterfaceTier::for_access(ctx),
        role_label: ctx.role().label(),
        navigation,
    }
}

async fn admin_interface(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
) -> Json<InterfaceView> {
    Json(view(&state, &ctx))
}

async fn shared_interface(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
) -> Json<InterfaceView> {
    Json(view(&state, &ctx))
}

async fn home(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
) -> Json<InterfaceView> {
    Json(view(&state, &ctx))
}

#[derive(Debug, Serialize)]
pub struct ElectionManagement {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

async fn manage_elections(CurrentAccess(ctx): CurrentAccess) -> Json<ElectionManagement> {
    Json(ElectionManagement {
        can_create: ctx.has_permission(Action::Create, Resource::Elections),
        can_update: ctx.has_permission(Action::Update, Resource::Elections),
        can_delete: ctx.has_permission(Action::Delete, Resource::Elections),
    })
}
