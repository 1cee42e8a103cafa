use async_graphql::{Context, SimpleObject};
use chrono::{Duration, Utc};
use entity::{event, registration, user};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use super::{database, db_error, require_permission};

/// Headline figures for the admin statistics panel.
#[derive(Clone, Debug, SimpleObject)]
pub struct AdminStats {
    #[graphql(name = "totalUsers")]
    pub total_users: i64,
    #[graphql(name = "activeUsers")]
    pub active_users: i64,
    #[graphql(name = "totalEvents")]
    pub total_events: i64,
    #[graphql(name = "publishedEvents")]
    pub published_events: i64,
    #[graphql(name = "totalRegistrations")]
    pub total_registrations: i64,
    #[graphql(name = "recentRegistrations")]
    pub recent_registrations: i64,
}

pub(super) async fn resolve(ctx: &Context<'_>) -> async_graphql::Result<AdminStats> {
    require_permission(ctx, "STATS:VIEW")?;
    let db = database(ctx)?;
    let conn = db.as_ref();

    let total_users = user::Entity::find().count(conn).await.map_err(db_error)?;
    let active_users = user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .count(conn)
        .await
        .map_err(db_error)?;
    let total_events = event::Entity::find().count(conn).await.map_err(db_error)?;
    let published_events = event::Entity::find()
        .filter(event::Column::Status.eq(event::Status::Published))
        .count(conn)
        .await
        .map_err(db_error)?;
    let total_registrations = registration::Entity::find()
        .count(conn)
        .await
        .map_err(db_error)?;
    let cutoff: sea_orm::prelude::DateTimeWithTimeZone = (Utc::now() - Duration::days(30)).into();
    let recent_registrations = registration::Entity::find()
        .filter(registration::Column::CreatedAt.gte(cutoff))
        .count(conn)
        .await
        .map_err(db_error)?;

    Ok(AdminStats {
        total_users: total_users as i64,
        active_users: active_users as i64,
        total_events: total_events as i64,
        published_events: published_events as i64,
        total_registrations: total_registrations as i64,
        recent_registrations: recent_registrations as i64,
    })
}
