//! Database primitives plus the permission store.
//!
//! `resolve_session` is the single place a request's identity is turned
//! into a [`PermissionSnapshot`]: session row, user row, role rows, and
//! role grants are read once and collapsed into an immutable snapshot the
//! authorization core consumes. Nothing downstream re-queries the store
//! inside one request.

use chrono::Utc;
use entity::{role_permission, session, user, user_role};
use platform_authz::{PermissionSet, PermissionSnapshot, PrincipalType};
use sea_orm::{
    ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Shared Postgres pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
        }
    }
}

impl DatabaseSettings {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    Ok(Database::connect(url).await?)
}

/// The user behind an authenticated session.
#[derive(Clone, Debug)]
pub struct StoreUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub roles: Vec<user_role::Role>,
}

/// An authenticated session with its resolved snapshot.
#[derive(Clone, Debug)]
pub struct ResolvedSession {
    pub user: StoreUser,
    pub snapshot: PermissionSnapshot,
}

/// What a session cookie resolved to. Expired or dangling sessions fold
/// into `Anonymous`; they are indistinguishable from no cookie at all.
#[derive(Clone, Debug)]
pub enum SessionState {
    Anonymous,
    Active(ResolvedSession),
}

impl SessionState {
    pub fn snapshot(&self) -> PermissionSnapshot {
        match self {
            SessionState::Anonymous => PermissionSnapshot::anonymous(),
            SessionState::Active(active) => active.snapshot.clone(),
        }
    }
}

/// Collapses a role set to the single principal type admission decisions
/// use. Precedence: admin over system user over organizer over end user.
pub fn principal_for_roles(roles: &[user_role::Role]) -> PrincipalType {
    use user_role::Role;
    if roles.contains(&Role::Admin) {
        PrincipalType::Admin
    } else if roles.contains(&Role::SystemUser) {
        PrincipalType::SystemUser
    } else if roles.contains(&Role::Organizer) {
        PrincipalType::Organizer
    } else if roles.contains(&Role::EndUser) {
        PrincipalType::EndUser
    } else {
        PrincipalType::Anonymous
    }
}

/// Loads the flat permission set granted to any of `roles`.
pub async fn permissions_for_roles(
    db: &DbPool,
    roles: &[user_role::Role],
) -> Result<PermissionSet, DbErr> {
    if roles.is_empty() {
        return Ok(PermissionSet::new());
    }
    let grants = role_permission::Entity::find()
        .filter(role_permission::Column::Role.is_in(roles.iter().copied()))
        .all(db)
        .await?;
    Ok(grants.into_iter().map(|grant| grant.permission).collect())
}

/// Resolves a session id into a fresh permission snapshot.
///
/// Expired sessions are deleted on sight. Inactive users resolve to
/// `Anonymous` even while their session row still exists.
pub async fn resolve_session(db: &DbPool, session_id: Uuid) -> Result<SessionState, DbErr> {
    let Some(session) = session::Entity::find_by_id(session_id).one(db).await? else {
        return Ok(SessionState::Anonymous);
    };
    if session.expires_at.with_timezone(&Utc) < Utc::now() {
        let _ = session::Entity::delete_by_id(session_id).exec(db).await;
        return Ok(SessionState::Anonymous);
    }
    let Some(account) = user::Entity::find_by_id(session.user_id).one(db).await? else {
        return Ok(SessionState::Anonymous);
    };
    if !account.is_active {
        return Ok(SessionState::Anonymous);
    }
    let roles: Vec<user_role::Role> = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(account.id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.role)
        .collect();
    let permissions = permissions_for_roles(db, &roles).await?;
    let snapshot = PermissionSnapshot::authenticated(principal_for_roles(&roles), permissions);
    Ok(SessionState::Active(ResolvedSession {
        user: StoreUser {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            avatar_url: account.avatar_url,
            roles,
        },
        snapshot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::user_role::Role;

    #[test]
    fn principal_precedence_prefers_admin() {
        assert_eq!(
            principal_for_roles(&[Role::EndUser, Role::Admin, Role::Organizer]),
            PrincipalType::Admin
        );
        assert_eq!(
            principal_for_roles(&[Role::Organizer, Role::SystemUser]),
            PrincipalType::SystemUser
        );
        assert_eq!(
            principal_for_roles(&[Role::EndUser, Role::Organizer]),
            PrincipalType::Organizer
        );
        assert_eq!(principal_for_roles(&[Role::EndUser]), PrincipalType::EndUser);
    }

    #[test]
    fn empty_role_set_is_anonymous() {
        assert_eq!(principal_for_roles(&[]), PrincipalType::Anonymous);
    }

    #[test]
    fn anonymous_state_yields_anonymous_snapshot() {
        let snap = SessionState::Anonymous.snapshot();
        assert!(!snap.authenticated);
        assert!(snap.permissions.is_empty());
    }
}
