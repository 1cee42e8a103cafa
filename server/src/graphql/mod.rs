mod me;
mod nav;
mod notifications;
mod stats;
mod users;

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, ID, Object, Schema, SimpleObject,
};
use platform_api::ApiError;
use platform_authz::PermissionCode;
use platform_db::{DbPool, StoreUser};
use sea_orm::DbErr;
use tracing::instrument;
use uuid::Uuid;

use crate::session::RequestContext;

pub use me::MePayload;
pub use nav::NavPayload;
pub use notifications::NotificationNode;
pub use stats::AdminStats;
pub use users::{NewUserInput, RoleNode, UpdateUserInput, UserNode};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(pool: Arc<DbPool>) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(pool)
        .finish()
}

pub struct QueryRoot;
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<MePayload>> {
        me::resolve(ctx).await
    }

    #[instrument(name = "graphql.users", skip_all)]
    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        q: Option<String>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        users::list(ctx, first, offset, q).await
    }

    #[instrument(name = "graphql.user", skip_all)]
    async fn user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<UserNode> {
        users::get(ctx, id).await
    }

    #[instrument(name = "graphql.roles", skip_all)]
    async fn roles(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<RoleNode>> {
        users::role_catalog(ctx).await
    }

    #[instrument(name = "graphql.notifications", skip_all)]
    async fn notifications(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        #[graphql(name = "unreadOnly")] unread_only: Option<bool>,
    ) -> async_graphql::Result<Vec<NotificationNode>> {
        notifications::list(ctx, first, offset, unread_only.unwrap_or(false)).await
    }

    #[instrument(name = "graphql.unread_count", skip_all)]
    #[graphql(name = "unreadNotificationCount")]
    async fn unread_notification_count(&self, ctx: &Context<'_>) -> async_graphql::Result<i32> {
        notifications::unread_count(ctx).await
    }

    #[instrument(name = "graphql.admin_stats", skip_all)]
    #[graphql(name = "adminStats")]
    async fn admin_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<AdminStats> {
        stats::resolve(ctx).await
    }

    #[instrument(name = "graphql.navigation", skip_all)]
    async fn navigation(&self, ctx: &Context<'_>) -> async_graphql::Result<NavPayload> {
        nav::resolve(ctx)
    }
}

#[Object]
impl MutationRoot {
    #[instrument(name = "graphql.create_user", skip_all)]
    #[graphql(name = "createUser")]
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        users::create(ctx, input).await
    }

    #[instrument(name = "graphql.update_user", skip_all)]
    #[graphql(name = "updateUser")]
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> async_graphql::Result<UserNode> {
        users::update(ctx, input).await
    }

    #[instrument(name = "graphql.mark_notification_read", skip_all)]
    #[graphql(name = "markNotificationRead")]
    async fn mark_notification_read(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<NotificationNode> {
        notifications::mark_read(ctx, id).await
    }

    #[instrument(name = "graphql.mark_all_notifications_read", skip_all)]
    #[graphql(name = "markAllNotificationsRead")]
    async fn mark_all_notifications_read(&self, ctx: &Context<'_>) -> async_graphql::Result<i32> {
        notifications::mark_all_read(ctx).await
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DbPool>> {
    ctx.data::<Arc<DbPool>>()
        .cloned()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing database handle")).extend())
}

fn request_context<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a RequestContext> {
    ctx.data::<RequestContext>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing request context")).extend())
}

fn require_authenticated<'a>(
    ctx: &'a Context<'_>,
) -> async_graphql::Result<(&'a StoreUser, &'a RequestContext)> {
    let rc = request_context(ctx)?;
    match &rc.user {
        Some(user) if rc.snapshot.authenticated => Ok((user, rc)),
        _ => Err(ApiError::Unauthenticated.extend()),
    }
}

/// Field-level gate: authenticated principal holding `code`, or the
/// request fails with a stable `FORBIDDEN`/`UNAUTHENTICATED` code.
fn require_permission<'a>(
    ctx: &'a Context<'_>,
    code: &str,
) -> async_graphql::Result<&'a StoreUser> {
    let (user, rc) = require_authenticated(ctx)?;
    if rc.snapshot.has_permission(&PermissionCode::from(code)) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden.extend())
    }
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| ApiError::invalid("invalid id").extend())
}

fn db_error(err: DbErr) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Request;
    use sea_orm::DatabaseConnection;
    use serde_json::json;

    fn test_schema() -> SchemaType {
        build_schema(Arc::new(DatabaseConnection::default()))
    }

    #[tokio::test]
    async fn health_query_returns_ok() {
        let schema = test_schema();
        let request = Request::new("{ health { ok } }").data(RequestContext::anonymous());
        let response = schema.execute(request).await;
        assert!(response.errors.is_empty());
        let body = response.data.into_json().unwrap();
        assert_eq!(body, json!({"health": {"ok": true}}));
    }

    #[tokio::test]
    async fn gated_query_without_session_is_unauthenticated() {
        let schema = test_schema();
        let request = Request::new("{ users { id } }").data(RequestContext::anonymous());
        let response = schema.execute(request).await;
        let err = response.errors.first().expect("expected an error");
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(async_graphql::Value::from("UNAUTHENTICATED")));
    }

    #[tokio::test]
    async fn navigation_is_empty_for_anonymous_requests() {
        let schema = test_schema();
        let request =
            Request::new("{ navigation { items { key } } }").data(RequestContext::anonymous());
        let response = schema.execute(request).await;
        assert!(response.errors.is_empty());
        let body = response.data.into_json().unwrap();
        assert_eq!(body, json!({"navigation": {"items": []}}));
    }
}
