use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use super::entities::prelude::{Todo, User};
use super::entities::{todo, user};

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    User::find_by_id(*id).one(db).await
}

/// The unique index on `email` is the duplicate check; a violation comes back
/// as the distinct `DuplicateEmail` kind.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    full_name: &str,
    password_hash: &str,
) -> Result<user::Model, CreateUserError> {
    let now = Utc::now().fixed_offset();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(full_name.to_string()),
        password_hash: Set(password_hash.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => CreateUserError::DuplicateEmail,
        _ => CreateUserError::Db(err),
    })
}

/// Administrative removal, not routed over HTTP. Deletes the user's todos and
/// then the user inside one transaction.
pub async fn delete_user(db: &DatabaseConnection, id: &Uuid) -> Result<bool, sea_orm::DbErr> {
    let txn = db.begin().await?;
    Todo::delete_many()
        .filter(todo::Column::OwnerId.eq(*id))
        .exec(&txn)
        .await?;
    let result = User::delete_by_id(*id).exec(&txn).await?;
    txn.commit().await?;
    Ok(result.rows_affected > 0)
}
