use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context as _;
use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use chrono::{Duration, Utc};
use entity::{session, user, user_identity, user_secret};
use platform_db::DbPool;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, QueryFilter,
    Statement,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    graphql::SchemaType,
    guard, session as session_layer,
    session::{RequestContext, removal_cookie, session_cookie},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "admin server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");

    let admin_pages = Router::new()
        .route("/admin", get(admin_shell))
        .route("/admin/{*rest}", get(admin_shell))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::admin_pages,
        ));
    let organizer_pages = Router::new()
        .route("/dashboard", get(dashboard_shell))
        .route("/dashboard/{*rest}", get(dashboard_shell))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::organizer_pages,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(login_shell).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/graphql", post(graphql_handler))
        .merge(admin_pages)
        .merge(organizer_pages)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionUser {
    id: Uuid,
    email: String,
    #[serde(rename = "displayName")]
    display_name: String,
    roles: Vec<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl LoginResponse {
    fn rejected() -> (StatusCode, Json<LoginResponse>) {
        (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                ok: false,
                user: None,
                error: Some("invalid credentials"),
            }),
        )
    }
}

async fn login_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(request): Json<LoginRequest>,
) -> HttpResult<Response> {
    let email = request.email.trim().to_ascii_lowercase();
    let identity = user_identity::Entity::find()
        .filter(user_identity::Column::Provider.eq("local"))
        .filter(user_identity::Column::Subject.eq(email))
        .one(&state.pool)
        .await
        .map_err(HttpError::db)?;
    let Some(identity) = identity else {
        return Ok(LoginResponse::rejected().into_response());
    };
    let account = user::Entity::find_by_id(identity.user_id)
        .one(&state.pool)
        .await
        .map_err(HttpError::db)?;
    let Some(account) = account else {
        return Ok(LoginResponse::rejected().into_response());
    };
    if !account.is_active {
        return Ok(LoginResponse::rejected().into_response());
    }
    let secret = user_secret::Entity::find_by_id(account.id)
        .one(&state.pool)
        .await
        .map_err(HttpError::db)?;
    let Some(secret) = secret else {
        return Ok(LoginResponse::rejected().into_response());
    };
    let parsed_hash = PasswordHash::new(&secret.password_hash)
        .map_err(|_| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "invalid password hash"))?;
    if Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(LoginResponse::rejected().into_response());
    }

    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let expires_at = now + Duration::days(state.config.session_ttl_days);
    session::ActiveModel {
        id: Set(session_id),
        user_id: Set(account.id),
        created_at: Set(now.into()),
        expires_at: Set(expires_at.into()),
        ip: Set(None),
        user_agent: Set(None),
    }
    .insert(&state.pool)
    .await
    .map_err(HttpError::db)?;

    let roles = entity::user_role::Entity::find()
        .filter(entity::user_role::Column::UserId.eq(account.id))
        .all(&state.pool)
        .await
        .map_err(HttpError::db)?
        .into_iter()
        .map(|row| row.role.as_str().to_string())
        .collect();

    let jar = jar.add(session_cookie(session_id, state.config.session_ttl_days));
    let body = Json(LoginResponse {
        ok: true,
        user: Some(SessionUser {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            roles,
        }),
        error: None,
    });
    Ok((jar, body).into_response())
}

async fn logout_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> HttpResult<(PrivateCookieJar, StatusCode)> {
    if let Some(cookie) = jar.get(session_layer::SESSION_COOKIE) {
        if let Ok(session_id) = Uuid::parse_str(cookie.value()) {
            let _ = session::Entity::delete_by_id(session_id)
                .exec(&state.pool)
                .await;
        }
    }
    let jar = jar.remove(removal_cookie());
    Ok((jar, StatusCode::NO_CONTENT))
}

async fn graphql_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    request: GraphQLRequest,
) -> HttpResult<GraphQLResponse> {
    let session = session_layer::current_session(&state.pool, &jar)
        .await
        .map_err(HttpError::db)?;
    let mut req = request.into_inner();
    req = req.data(RequestContext::from(session));
    let response = state.schema.execute(req).await;
    Ok(GraphQLResponse::from(response))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state
        .pool
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

// Minimal shells for the single-page admin client; real markup is served
// by the front-end build, these only anchor the guarded paths.
async fn admin_shell() -> Html<&'static str> {
    Html("<!doctype html><title>EventSuite Admin</title><div id=\"root\"></div>")
}

async fn dashboard_shell() -> Html<&'static str> {
    Html("<!doctype html><title>EventSuite Dashboard</title><div id=\"root\"></div>")
}

async fn login_shell() -> Html<&'static str> {
    Html("<!doctype html><title>EventSuite Login</title><div id=\"root\"></div>")
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }

    fn db(err: sea_orm::DbErr) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql;
    use axum::body::Body;
    use axum::http::Request;
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Arc::new(AppConfig {
            cookie_key: Key::from(&[7u8; 64]),
            cors_allowed_origins: vec![],
            session_ttl_days: 30,
        });
        let pool: DbPool = DatabaseConnection::default();
        AppState {
            schema: graphql::build_schema(Arc::new(pool.clone())),
            cookie_key: config.cookie_key.clone(),
            pool,
            config,
        }
    }

    #[tokio::test]
    async fn guarded_page_without_session_redirects_to_login() {
        let router = build_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(http::header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[tokio::test]
    async fn dashboard_without_session_redirects_to_login() {
        let router = build_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(http::header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[tokio::test]
    async fn login_shell_is_public() {
        let router = build_router(test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
