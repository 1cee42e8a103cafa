use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
#[sea_orm(iden = "user")]
enum User {
    Table,
    Id,
    Email,
    DisplayName,
    AvatarUrl,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "user_identity")]
enum UserIdentity {
    Table,
    Id,
    UserId,
    Provider,
    Subject,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "user_secret")]
enum UserSecret {
    Table,
    UserId,
    PasswordHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "user_role")]
enum UserRole {
    Table,
    UserId,
    Role,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "role_permission")]
enum RolePermission {
    Table,
    Role,
    Permission,
}

// Default grants per role. Admin and system-user rows are kept identical on
// purpose; both belong to the admin admission class.
const DEFAULT_GRANTS: &str = r#"
INSERT INTO role_permission (role, permission) VALUES
  ('ADMIN', 'USER:LIST'),
  ('ADMIN', 'USER:VIEW'),
  ('ADMIN', 'USER:CREATE'),
  ('ADMIN', 'USER:UPDATE'),
  ('ADMIN', 'ROLE:LIST'),
  ('ADMIN', 'EVENT:LIST'),
  ('ADMIN', 'NOTIFICATION:LIST'),
  ('ADMIN', 'NOTIFICATION:MANAGE'),
  ('ADMIN', 'STATS:VIEW'),
  ('SYSTEM_USER', 'USER:LIST'),
  ('SYSTEM_USER', 'USER:VIEW'),
  ('SYSTEM_USER', 'USER:CREATE'),
  ('SYSTEM_USER', 'USER:UPDATE'),
  ('SYSTEM_USER', 'ROLE:LIST'),
  ('SYSTEM_USER', 'EVENT:LIST'),
  ('SYSTEM_USER', 'NOTIFICATION:LIST'),
  ('SYSTEM_USER', 'NOTIFICATION:MANAGE'),
  ('SYSTEM_USER', 'STATS:VIEW'),
  ('ORGANIZER', 'EVENT:LIST'),
  ('ORGANIZER', 'NOTIFICATION:LIST'),
  ('END_USER', 'NOTIFICATION:LIST')
ON CONFLICT DO NOTHING;
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(User::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::DisplayName).string().not_null())
                    .col(ColumnDef::new(User::AvatarUrl).string())
                    .col(
                        ColumnDef::new(User::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(User::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserIdentity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserIdentity::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(UserIdentity::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserIdentity::Provider).string().not_null())
                    .col(ColumnDef::new(UserIdentity::Subject).string().not_null())
                    .col(
                        ColumnDef::new(UserIdentity::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UserIdentity::Table, UserIdentity::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_user_identity_provider_subject")
                            .col(UserIdentity::Provider)
                            .col(UserIdentity::Subject)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSecret::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSecret::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSecret::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSecret::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UserSecret::Table, UserSecret::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRole::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRole::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserRole::Role).string_len(16).not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRole::UserId)
                            .col(UserRole::Role),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UserRole::Table, UserRole::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RolePermission::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RolePermission::Role)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RolePermission::Permission)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RolePermission::Role)
                            .col(RolePermission::Permission),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(DEFAULT_GRANTS)
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "role_permission",
            "user_role",
            "user_secret",
            "user_identity",
            "\"user\"",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
                .await?;
        }
        Ok(())
    }
}
