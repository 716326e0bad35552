mod access;
mod auth;
mod interface;

pub use access::{AccessSummary, InterfaceTier};
pub use auth::UPSTREAM_SECRET_HEADER;

use axum::Router;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/access", access::routes())
        .nest("/interface", interface::routes(state))
}
