//! Page-level route guarding.
//!
//! Each guarded page group gets a middleware that resolves the session
//! once, asks `platform-authz` for an admission decision, and either lets
//! the request through, redirects (303, replacing the history entry on the
//! client), or answers with a retryable placeholder while the snapshot is
//! still resolving.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use platform_authz::{DEFAULT_REDIRECT, PrincipalType, RouteDecision, evaluate_route};
use tracing::warn;

use crate::{http::AppState, session};

pub async fn admin_pages(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    apply(&state, &jar, Some(PrincipalType::Admin), request, next).await
}

pub async fn organizer_pages(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    apply(&state, &jar, Some(PrincipalType::Organizer), request, next).await
}

async fn apply(
    state: &AppState,
    jar: &PrivateCookieJar,
    required: Option<PrincipalType>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = match session::current_session(&state.pool, jar).await {
        Ok(session) => session.snapshot(),
        Err(err) => {
            warn!(error = %err, "session resolution failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "session lookup failed").into_response();
        }
    };
    match evaluate_route(&snapshot, required, DEFAULT_REDIRECT) {
        RouteDecision::ShowLoading => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            "signing you in",
        )
            .into_response(),
        RouteDecision::Redirect(path) => Redirect::to(&path).into_response(),
        RouteDecision::Allowed => next.run(request).await,
    }
}
