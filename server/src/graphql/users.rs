use std::collections::HashMap;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};
use async_graphql::{Context, ErrorExtensions, ID, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use entity::user_role::Role;
use entity::{user, user_identity, user_role, user_secret};
use platform_api::ApiError;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use super::{database, db_error, parse_uuid, require_permission};

const MAX_USERS_PAGE: i32 = 200;

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    #[graphql(name = "avatarUrl")]
    pub avatar_url: Option<String>,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    pub roles: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UserNode {
    pub(super) fn from_model(model: user::Model, roles: Vec<String>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
            is_active: model.is_active,
            roles,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// One entry of the role catalog: the role name plus its flat grants.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Role")]
pub struct RoleNode {
    pub role: String,
    pub permissions: Vec<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewUserInput {
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub roles: Vec<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateUserInput {
    pub id: ID,
    #[graphql(name = "displayName")]
    pub display_name: Option<String>,
    pub roles: Option<Vec<String>>,
    #[graphql(name = "isActive")]
    pub is_active: Option<bool>,
}

pub(super) async fn list(
    ctx: &Context<'_>,
    first: Option<i32>,
    offset: Option<i32>,
    q: Option<String>,
) -> async_graphql::Result<Vec<UserNode>> {
    require_permission(ctx, "USER:LIST")?;
    let db = database(ctx)?;
    let limit = first.unwrap_or(50).clamp(1, MAX_USERS_PAGE) as u64;
    let skip = offset.unwrap_or(0).max(0) as u64;
    let mut query = user::Entity::find();
    if let Some(filter) = sanitize_optional_filter(q) {
        let pattern = format!("%{}%", filter);
        query = query.filter(
            Condition::any()
                .add(user::Column::Email.like(pattern.clone()))
                .add(user::Column::DisplayName.like(pattern)),
        );
    }
    let records = query
        .order_by_asc(user::Column::Email)
        .limit(limit)
        .offset(skip)
        .all(db.as_ref())
        .await
        .map_err(db_error)?;
    let role_map = load_roles_for_users(db.as_ref(), &records).await?;
    Ok(records
        .into_iter()
        .map(|model| {
            let roles = role_map.get(&model.id).cloned().unwrap_or_default();
            UserNode::from_model(model, roles)
        })
        .collect())
}

pub(super) async fn get(ctx: &Context<'_>, id: ID) -> async_graphql::Result<UserNode> {
    require_permission(ctx, "USER:VIEW")?;
    let db = database(ctx)?;
    let user_id = parse_uuid(&id)?;
    let model = user::Entity::find_by_id(user_id)
        .one(db.as_ref())
        .await
        .map_err(db_error)?
        .ok_or_else(|| ApiError::NotFound.extend())?;
    let roles = load_roles(db.as_ref(), user_id).await?;
    Ok(UserNode::from_model(model, roles))
}

pub(super) async fn role_catalog(ctx: &Context<'_>) -> async_graphql::Result<Vec<RoleNode>> {
    require_permission(ctx, "ROLE:LIST")?;
    let db = database(ctx)?;
    let grants = entity::role_permission::Entity::find()
        .all(db.as_ref())
        .await
        .map_err(db_error)?;
    let mut by_role: HashMap<Role, Vec<String>> = HashMap::new();
    for grant in grants {
        by_role.entry(grant.role).or_default().push(grant.permission);
    }
    Ok([Role::Admin, Role::SystemUser, Role::Organizer, Role::EndUser]
        .into_iter()
        .map(|role| {
            let mut permissions = by_role.remove(&role).unwrap_or_default();
            permissions.sort();
            RoleNode {
                role: role.as_str().to_string(),
                permissions,
            }
        })
        .collect())
}

pub(super) async fn create(
    ctx: &Context<'_>,
    input: NewUserInput,
) -> async_graphql::Result<UserNode> {
    require_permission(ctx, "USER:CREATE")?;
    let db = database(ctx)?;
    let email = normalize_email(&input.email)?;
    let display_name = validate_display_name(&input.display_name)?;
    let roles = parse_roles(&input.roles)?;
    if roles.is_empty() {
        return Err(ApiError::invalid("roles must include at least one entry").extend());
    }
    let password_hash = input
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let txn = db.begin().await.map_err(db_error)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let user_id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(user_id),
        email: Set(email.clone()),
        display_name: Set(display_name),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;
    user_identity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        provider: Set("local".into()),
        subject: Set(email),
        created_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;
    if let Some(hash) = password_hash {
        user_secret::ActiveModel {
            user_id: Set(user_id),
            password_hash: Set(hash),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
    }
    insert_roles(&txn, user_id, &roles).await?;
    txn.commit().await.map_err(db_error)?;

    let record = user::Entity::find_by_id(user_id)
        .one(db.as_ref())
        .await
        .map_err(db_error)?
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("failed to load new user")).extend())?;
    Ok(UserNode::from_model(
        record,
        roles.iter().map(|role| role.as_str().to_string()).collect(),
    ))
}

pub(super) async fn update(
    ctx: &Context<'_>,
    input: UpdateUserInput,
) -> async_graphql::Result<UserNode> {
    let actor = require_permission(ctx, "USER:UPDATE")?;
    let db = database(ctx)?;
    let user_id = parse_uuid(&input.id)?;
    if user_id == actor.id && input.is_active == Some(false) {
        return Err(ApiError::invalid("cannot deactivate your own account").extend());
    }
    let model = user::Entity::find_by_id(user_id)
        .one(db.as_ref())
        .await
        .map_err(db_error)?
        .ok_or_else(|| ApiError::NotFound.extend())?;

    let mut active: user::ActiveModel = model.into();
    if let Some(display_name) = &input.display_name {
        active.display_name = Set(validate_display_name(display_name)?);
    }
    if let Some(is_active) = input.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await.map_err(db_error)?;

    let roles = if let Some(role_values) = input.roles {
        let parsed = parse_roles(&role_values)?;
        if parsed.is_empty() {
            return Err(ApiError::invalid("roles must include at least one entry").extend());
        }
        let txn = db.begin().await.map_err(db_error)?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        insert_roles(&txn, user_id, &parsed).await?;
        txn.commit().await.map_err(db_error)?;
        parsed.iter().map(|role| role.as_str().to_string()).collect()
    } else {
        load_roles(db.as_ref(), user_id).await?
    };
    Ok(UserNode::from_model(updated, roles))
}

async fn insert_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    roles: &[Role],
) -> async_graphql::Result<()> {
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(*role),
        }
        .insert(conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

async fn load_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> async_graphql::Result<Vec<String>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .map(|row| row.role.as_str().to_string())
        .collect())
}

async fn load_roles_for_users<C: ConnectionTrait>(
    conn: &C,
    records: &[user::Model],
) -> async_graphql::Result<HashMap<Uuid, Vec<String>>> {
    if records.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.is_in(ids))
        .all(conn)
        .await
        .map_err(db_error)?;
    let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
        map.entry(row.user_id)
            .or_default()
            .push(row.role.as_str().to_string());
    }
    Ok(map)
}

fn hash_password(password: &str) -> async_graphql::Result<String> {
    if password.len() < 8 {
        return Err(ApiError::invalid("password must be at least 8 characters").extend());
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::internal(anyhow::anyhow!("password hashing failed")).extend())
}

fn normalize_email(raw: &str) -> async_graphql::Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if valid {
        Ok(email)
    } else {
        Err(ApiError::invalid("invalid email address").extend())
    }
}

fn validate_display_name(raw: &str) -> async_graphql::Result<String> {
    let name = raw.trim();
    if name.is_empty() || name.len() > 120 {
        Err(ApiError::invalid("display name must be 1-120 characters").extend())
    } else {
        Ok(name.to_string())
    }
}

fn parse_roles(values: &[String]) -> async_graphql::Result<Vec<Role>> {
    let mut roles = Vec::with_capacity(values.len());
    for value in values {
        let role = Role::from_str(value.trim())
            .ok_or_else(|| ApiError::invalid(format!("unknown role: {value}")).extend())?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@.com").is_err());
    }

    #[test]
    fn display_name_bounds() {
        assert_eq!(validate_display_name(" Alice ").unwrap(), "Alice");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn roles_parse_and_dedupe() {
        let parsed = parse_roles(&[
            "ADMIN".to_string(),
            "ORGANIZER".to_string(),
            "ADMIN".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed, vec![Role::Admin, Role::Organizer]);
        assert!(parse_roles(&["WIZARD".to_string()]).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(hash_password("short").is_err());
        assert!(hash_password("long enough secret").is_ok());
    }

    #[test]
    fn blank_filters_collapse_to_none() {
        assert_eq!(sanitize_optional_filter(Some("  ".into())), None);
        assert_eq!(
            sanitize_optional_filter(Some(" ada ".into())),
            Some("ada".into())
        );
    }
}
