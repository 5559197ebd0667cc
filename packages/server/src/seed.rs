use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::entity::{project, user};
use crate::utils::hash;

/// Ensure the admin account from configuration exists.
///
/// No-op when `auth.admin_email`/`auth.admin_password` are unset, and when
/// the account already exists (the password is not rotated here).
pub async fn seed_admin_user(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let (Some(email), Some(password)) =
        (auth.admin_email.as_deref(), auth.admin_password.as_deref())
    else {
        return Ok(());
    };

    let password_hash = hash::hash_password(password)
        .map_err(|e| DbErr::Custom(format!("admin password hash: {e}")))?;

    let now = chrono::Utc::now();
    let email = email.trim().to_lowercase();
    let model = user::ActiveModel {
        id: Set(Uuid::now_v7()),
        email: Set(email.clone()),
        password: Set(password_hash),
        display_name: Set(None),
        photo_url: Set(None),
        is_admin: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => {
            info!("Seeded admin user {email}");
            Ok(())
        }
        Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Keyset pagination scans: (created_at DESC, id DESC).
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_project_created_id")
        .table(project::Entity)
        .col(project::Column::CreatedAt)
        .col(project::Column::Id)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;

    // Featured carousel lookups.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_project_featured_created")
        .table(project::Entity)
        .col(project::Column::Featured)
        .col(project::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;

    info!("Ensured project indexes exist");
    Ok(())
}
