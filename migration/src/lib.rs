pub use sea_orm_migration::prelude::*;

mod m20250301_000001_auth_rbac;
mod m20250301_000002_sessions;
mod m20250302_000003_events;
mod m20250302_000004_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_auth_rbac::Migration),
            Box::new(m20250301_000002_sessions::Migration),
            Box::new(m20250302_000003_events::Migration),
            Box::new(m20250302_000004_notifications::Migration),
        ]
    }
}
