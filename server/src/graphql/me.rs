use async_graphql::{Context, ErrorExtensions, SimpleObject};
use entity::user;
use platform_api::ApiError;
use sea_orm::EntityTrait;

use super::{UserNode, database, db_error, request_context};

/// What the admin client's permission store is primed with after login:
/// the account, its roles, and the resolved flat permission codes.
#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

pub(super) async fn resolve(ctx: &Context<'_>) -> async_graphql::Result<Option<MePayload>> {
    let rc = request_context(ctx)?;
    let Some(store_user) = &rc.user else {
        return Ok(None);
    };
    let db = database(ctx)?;
    let model = user::Entity::find_by_id(store_user.id)
        .one(db.as_ref())
        .await
        .map_err(db_error)?
        .ok_or_else(|| ApiError::NotFound.extend())?;
    let roles: Vec<String> = store_user
        .roles
        .iter()
        .map(|role| role.as_str().to_string())
        .collect();
    let mut permissions: Vec<String> = rc
        .snapshot
        .permissions
        .iter()
        .map(|code| code.as_str().to_string())
        .collect();
    permissions.sort();
    Ok(Some(MePayload {
        user: UserNode::from_model(model, roles.clone()),
        roles,
        permissions,
    }))
}
