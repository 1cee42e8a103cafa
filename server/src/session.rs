use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use platform_authz::PermissionSnapshot;
use platform_db::{DbPool, SessionState, StoreUser};
use sea_orm::DbErr;
use time::Duration as TimeDuration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "__Host-es_session";

/// Per-request identity, attached to every GraphQL execution.
///
/// Holds the snapshot the authorization core consumes plus the resolved
/// user for resolvers that need ownership checks. Built exactly once per
/// request; gating never triggers a second store lookup.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user: Option<StoreUser>,
    pub snapshot: PermissionSnapshot,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            snapshot: PermissionSnapshot::anonymous(),
        }
    }
}

impl From<SessionState> for RequestContext {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Anonymous => Self::anonymous(),
            SessionState::Active(active) => Self {
                snapshot: active.snapshot,
                user: Some(active.user),
            },
        }
    }
}

/// Resolves the session cookie against the store. A missing or unparsable
/// cookie is an anonymous request, not an error.
pub async fn current_session(pool: &DbPool, jar: &PrivateCookieJar) -> Result<SessionState, DbErr> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(SessionState::Anonymous);
    };
    let Ok(session_id) = Uuid::parse_str(cookie.value()) else {
        return Ok(SessionState::Anonymous);
    };
    platform_db::resolve_session(pool, session_id).await
}

pub fn session_cookie(session_id: Uuid, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::days(ttl_days))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
