//! Session and access middleware
//!
//! `load_access` wraps every route: it opens the visitor's session from the
//! cookie, resolves the [`AccessContext`] (role + elevation), exposes both to
//! handlers through request extensions, and flushes changed session keys
//! once the handler has run. The `require_*` guards are route layers that
//! consult the access gate.

use access_control::{AccessContext, AccessPredicate, Requirement, Session, SessionId};
use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

/// Per-request handle on the visitor's session
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<Session>>,
    ended: Arc<AtomicBool>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &Mutex<Session> {
        &self.session
    }

    /// End the session once the response is produced (logout).
    pub fn end(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

pub async fn load_access(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session.cookie_name.clone();
    let incoming = jar
        .get(&cookie_name)
        .and_then(|cookie| SessionId::parse(cookie.value()));

    let query = request.uri().query().map(str::to_owned);

    let mut session = state.sessions.open(incoming).await;
    let ctx = state.pipeline.evaluate(&mut session, query.as_deref()).await;

    tracing::debug!(
        session_id = %session.id(),
        role = %ctx.role(),
        elevated = ctx.is_elevated(),
        "Access context resolved"
    );

    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;

    let mut session = handle.session.lock().await;

    if handle.is_ended() {
        if let Err(e) = state.sessions.destroy(session.id()).await {
            tracing::error!(error = %e, "Failed to destroy session");
        }
        let removal = Cookie::build((cookie_name, "")).path("/").build();
        return (jar.remove(removal), response).into_response();
    }

    let issue_cookie = session.is_fresh() && !session.changes().is_empty();
    if let Err(e) = state.sessions.flush(&mut session).await {
        tracing::error!(error = %e, session_id = %session.id(), "Failed to flush session");
        return response;
    }

    if issue_cookie {
        let cookie = Cookie::build((cookie_name, session.id().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        return (jar.add(cookie), response).into_response();
    }

    response
}

fn enforce<P>(state: &AppState, request: &Request, predicate: &P) -> Result<(), AppError>
where
    P: AccessPredicate + ?Sized,
{
    let ctx = request
        .extensions()
        .get::<AccessContext>()
        .copied()
        .unwrap_or_else(AccessContext::anonymous);

    // Nested routers strip their prefix; redirect back to what was asked for.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| request.uri());
    let requested = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    state
        .gate
        .authorize(&ctx, predicate)
        .into_result()
        .map_err(|reason| {
            tracing::info!(path = %requested, reason = %reason, "Request denied");
            AppError::AccessDenied(state.gate.denial(reason, requested))
        })
}

pub async fn require_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, &request, &Requirement::LoggedIn)?;
    Ok(next.run(request).await)
}

pub async fn require_admin_interface(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, &request, &Requirement::AdminInterface)?;
    Ok(next.run(request).await)
}

pub async fn require_admin_or_member(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, &request, &Requirement::AdminInterfaceOrMember)?;
    Ok(next.run(request).await)
}

pub async fn require_election_manager(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, &request, &Requirement::ManageElections)?;
    Ok(next.run(request).await)
}

/// Resolved access for handlers; anonymous when `load_access` did not run.
#[derive(Debug, Clone, Copy)]
pub struct CurrentAccess(pub AccessContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentAccess
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentAccess(
            parts
                .extensions
                .get::<AccessContext>()
                .copied()
                .unwrap_or_else(AccessContext::anonymous),
        ))
    }
}
