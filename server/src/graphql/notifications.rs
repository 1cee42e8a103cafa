use async_graphql::{Context, Enum, ErrorExtensions, ID, SimpleObject};
use chrono::{DateTime, Utc};
use entity::notification;
use platform_api::ApiError;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::{database, db_error, parse_uuid, require_permission};

const MAX_NOTIFICATIONS_PAGE: i32 = 100;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    #[graphql(name = "REGISTRATION")]
    Registration,
    #[graphql(name = "EVENT_UPDATE")]
    EventUpdate,
    #[graphql(name = "SYSTEM")]
    System,
    #[graphql(name = "REVIEW")]
    Review,
}

impl From<notification::Kind> for NotificationKind {
    fn from(kind: notification::Kind) -> Self {
        match kind {
            notification::Kind::Registration => NotificationKind::Registration,
            notification::Kind::EventUpdate => NotificationKind::EventUpdate,
            notification::Kind::System => NotificationKind::System,
            notification::Kind::Review => NotificationKind::Review,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Notification")]
pub struct NotificationNode {
    pub id: ID,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub href: Option<String>,
    #[graphql(name = "isRead")]
    pub is_read: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "readAt")]
    pub read_at: Option<DateTime<Utc>>,
}

impl From<notification::Model> for NotificationNode {
    fn from(model: notification::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            kind: model.kind.into(),
            title: model.title,
            body: model.body,
            href: model.href,
            is_read: model.is_read,
            created_at: model.created_at.into(),
            read_at: model.read_at.map(Into::into),
        }
    }
}

pub(super) async fn list(
    ctx: &Context<'_>,
    first: Option<i32>,
    offset: Option<i32>,
    unread_only: bool,
) -> async_graphql::Result<Vec<NotificationNode>> {
    let viewer = require_permission(ctx, "NOTIFICATION:LIST")?;
    let db = database(ctx)?;
    let limit = first.unwrap_or(20).clamp(1, MAX_NOTIFICATIONS_PAGE) as u64;
    let skip = offset.unwrap_or(0).max(0) as u64;
    let mut query = notification::Entity::find()
        .filter(notification::Column::UserId.eq(viewer.id));
    if unread_only {
        query = query.filter(notification::Column::IsRead.eq(false));
    }
    let records = query
        .order_by_desc(notification::Column::CreatedAt)
        .limit(limit)
        .offset(skip)
        .all(db.as_ref())
        .await
        .map_err(db_error)?;
    Ok(records.into_iter().map(Into::into).collect())
}

pub(super) async fn unread_count(ctx: &Context<'_>) -> async_graphql::Result<i32> {
    let viewer = require_permission(ctx, "NOTIFICATION:LIST")?;
    let db = database(ctx)?;
    let count = notification::Entity::find()
        .filter(notification::Column::UserId.eq(viewer.id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db.as_ref())
        .await
        .map_err(db_error)?;
    Ok(count.min(i32::MAX as u64) as i32)
}

pub(super) async fn mark_read(
    ctx: &Context<'_>,
    id: ID,
) -> async_graphql::Result<NotificationNode> {
    let viewer = require_permission(ctx, "NOTIFICATION:LIST")?;
    let db = database(ctx)?;
    let notification_id = parse_uuid(&id)?;
    let model = notification::Entity::find_by_id(notification_id)
        .one(db.as_ref())
        .await
        .map_err(db_error)?
        // Hide other users' notifications behind the same NOT_FOUND.
        .filter(|model| model.user_id == viewer.id)
        .ok_or_else(|| ApiError::NotFound.extend())?;
    if model.is_read {
        return Ok(model.into());
    }
    let mut active: notification::ActiveModel = model.into();
    active.is_read = Set(true);
    active.read_at = Set(Some(Utc::now().into()));
    let updated = active.update(db.as_ref()).await.map_err(db_error)?;
    Ok(updated.into())
}

pub(super) async fn mark_all_read(ctx: &Context<'_>) -> async_graphql::Result<i32> {
    let viewer = require_permission(ctx, "NOTIFICATION:LIST")?;
    let db = database(ctx)?;
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let result = notification::Entity::update_many()
        .col_expr(
            notification::Column::IsRead,
            sea_orm::sea_query::Expr::value(true),
        )
        .col_expr(
            notification::Column::ReadAt,
            sea_orm::sea_query::Expr::value(now),
        )
        .filter(notification::Column::UserId.eq(viewer.id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db.as_ref())
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected.min(i32::MAX as u64) as i32)
}
