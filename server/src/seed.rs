//! Demo fixtures for local development.

use anyhow::{Result, anyhow};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};
use chrono::{Duration, Utc};
use entity::user_role::Role;
use entity::{event, notification, registration, user, user_identity, user_role, user_secret};
use platform_db::DbPool;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::info;
use uuid::Uuid;

/// Seeds one account per role plus a published event with registrations
/// and a few notifications. Idempotent on email; re-running skips existing
/// accounts. The admin password comes from `SEED_ADMIN_PASSWORD` or is
/// generated and logged once.
pub async fn run(pool: &DbPool) -> Result<()> {
    let admin_password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| random_password());

    let admin = ensure_user(pool, "admin@example.com", "Ada Admin", Role::Admin, &admin_password)
        .await?;
    let organizer = ensure_user(
        pool,
        "organizer@example.com",
        "Olga Organizer",
        Role::Organizer,
        &admin_password,
    )
    .await?;
    let attendee = ensure_user(
        pool,
        "attendee@example.com",
        "Andre Attendee",
        Role::EndUser,
        &admin_password,
    )
    .await?;

    let event_id = ensure_event(pool, "rustforge-2026", "RustForge 2026", organizer).await?;
    ensure_registration(pool, event_id, attendee).await?;
    ensure_notification(
        pool,
        admin,
        notification::Kind::Registration,
        "New registration",
        Some("/admin/events"),
    )
    .await?;
    ensure_notification(
        pool,
        organizer,
        notification::Kind::EventUpdate,
        "RustForge 2026 published",
        Some("/dashboard"),
    )
    .await?;

    info!(password = %admin_password, "seed accounts ready (admin/organizer/attendee @example.com)");
    Ok(())
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

async fn ensure_user(
    pool: &DbPool,
    email: &str,
    display_name: &str,
    role: Role,
    password: &str,
) -> Result<Uuid> {
    if let Some(existing) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(pool)
        .await?
    {
        return Ok(existing.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("password hashing failed: {err}"))?
        .to_string();

    let txn = pool.begin().await?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let user_id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(user_id),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    user_identity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        provider: Set("local".into()),
        subject: Set(email.to_string()),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(hash),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    user_role::ActiveModel {
        user_id: Set(user_id),
        role: Set(role),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(user_id)
}

async fn ensure_event(pool: &DbPool, slug: &str, title: &str, organizer_id: Uuid) -> Result<Uuid> {
    if let Some(existing) = event::Entity::find()
        .filter(event::Column::Slug.eq(slug))
        .one(pool)
        .await?
    {
        return Ok(existing.id);
    }
    let now = Utc::now();
    let event_id = Uuid::new_v4();
    event::ActiveModel {
        id: Set(event_id),
        title: Set(title.to_string()),
        slug: Set(slug.to_string()),
        status: Set(event::Status::Published),
        organizer_id: Set(Some(organizer_id)),
        starts_at: Set((now + Duration::days(60)).into()),
        ends_at: Set((now + Duration::days(62)).into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(pool)
    .await?;
    Ok(event_id)
}

async fn ensure_registration(pool: &DbPool, event_id: Uuid, user_id: Uuid) -> Result<()> {
    let exists = registration::Entity::find()
        .filter(registration::Column::EventId.eq(event_id))
        .filter(registration::Column::UserId.eq(user_id))
        .one(pool)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }
    registration::ActiveModel {
        id: Set(Uuid::new_v4()),
        event_id: Set(event_id),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(pool)
    .await?;
    Ok(())
}

async fn ensure_notification(
    pool: &DbPool,
    user_id: Uuid,
    kind: notification::Kind,
    title: &str,
    href: Option<&str>,
) -> Result<()> {
    let exists = notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Title.eq(title))
        .one(pool)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(kind),
        title: Set(title.to_string()),
        body: Set(None),
        href: Set(href.map(str::to_string)),
        is_read: Set(false),
        created_at: Set(Utc::now().into()),
        read_at: Set(None),
    }
    .insert(pool)
    .await?;
    Ok(())
}
