//! End-to-end session resolution against a real Postgres.
//!
//! Needs `TEST_DATABASE_URL` pointing at a throwaway database; the test
//! is skipped when the variable is absent so the default suite stays
//! hermetic.

use anyhow::Result;
use chrono::{Duration, Utc};
use entity::user_role::Role;
use entity::{session, user, user_role};
use migration::{Migrator, MigratorTrait};
use platform_authz::PrincipalType;
use platform_db::{DbPool, SessionState, resolve_session};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, Database, EntityTrait};
use uuid::Uuid;

#[tokio::test]
async fn sessions_resolve_to_expected_snapshots() -> Result<()> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(());
    };
    let pool = Database::connect(&url).await?;
    Migrator::up(&pool, None).await?;

    let admin = insert_user(&pool, "admin-it@example.com", true, &[Role::Admin]).await?;
    let organizer = insert_user(&pool, "org-it@example.com", true, &[Role::Organizer]).await?;
    let disabled = insert_user(&pool, "off-it@example.com", false, &[Role::Admin]).await?;

    let admin_session = insert_session(&pool, admin, Duration::hours(1)).await?;
    let organizer_session = insert_session(&pool, organizer, Duration::hours(1)).await?;
    let stale_session = insert_session(&pool, admin, Duration::hours(-1)).await?;
    let disabled_session = insert_session(&pool, disabled, Duration::hours(1)).await?;

    let SessionState::Active(active) = resolve_session(&pool, admin_session).await? else {
        panic!("admin session should resolve");
    };
    assert_eq!(active.snapshot.principal, PrincipalType::Admin);
    assert!(active.snapshot.has_permission(&"USER:LIST".into()));
    assert!(active.snapshot.has_permission(&"STATS:VIEW".into()));

    let SessionState::Active(active) = resolve_session(&pool, organizer_session).await? else {
        panic!("organizer session should resolve");
    };
    assert_eq!(active.snapshot.principal, PrincipalType::Organizer);
    assert!(active.snapshot.has_permission(&"EVENT:LIST".into()));
    assert!(!active.snapshot.has_permission(&"USER:LIST".into()));

    // Expired sessions fold into Anonymous and the row is reaped.
    assert!(matches!(
        resolve_session(&pool, stale_session).await?,
        SessionState::Anonymous
    ));
    assert!(
        session::Entity::find_by_id(stale_session)
            .one(&pool)
            .await?
            .is_none()
    );

    // Deactivated accounts stay locked out even with a live session row.
    assert!(matches!(
        resolve_session(&pool, disabled_session).await?,
        SessionState::Anonymous
    ));

    // Unknown ids never error.
    assert!(matches!(
        resolve_session(&pool, Uuid::new_v4()).await?,
        SessionState::Anonymous
    ));
    Ok(())
}

async fn insert_user(pool: &DbPool, email: &str, active: bool, roles: &[Role]) -> Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        display_name: Set(email.to_string()),
        avatar_url: Set(None),
        is_active: Set(active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(pool)
    .await?;
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(id),
            role: Set(*role),
        }
        .insert(pool)
        .await?;
    }
    Ok(id)
}

async fn insert_session(pool: &DbPool, user_id: Uuid, ttl: Duration) -> Result<Uuid> {
    let id = Uuid::new_v4();
    session::ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
        expires_at: Set((Utc::now() + ttl).into()),
        ip: Set(None),
        user_agent: Set(None),
    }
    .insert(pool)
    .await?;
    Ok(id)
}
