//! Role stores: one partition of accounts per role.
//!
//! Every store enforces username and email uniqueness within its own table
//! only. Nothing here looks at the other partitions.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr,
};

use super::entities::{admin, artist, customer, staff};
use crate::domain::{NewAccount, UserAccount, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Storage contract shared by all four account partitions.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Role of every account held by this store
    fn role(&self) -> UserRole;

    /// Insert a new account, failing with a business-rule error when the
    /// username or email is already taken in this store
    async fn create(&self, account: NewAccount) -> AppResult<UserAccount>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<UserAccount>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserAccount>>;

    async fn exists_by_username(&self, username: &str) -> AppResult<bool>;

    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// Persist mutable fields of an existing account
    async fn update(&self, account: UserAccount) -> AppResult<UserAccount>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    /// All accounts in id order
    async fn list(&self) -> AppResult<Vec<UserAccount>>;

    async fn count(&self) -> AppResult<u64>;
}

pub(crate) fn username_taken(username: &str) -> AppError {
    AppError::business_rule(format!("Username already exists: {}", username))
}

pub(crate) fn email_taken(email: &str) -> AppError {
    AppError::business_rule(format!("Email already exists: {}", email))
}

pub(crate) fn account_not_found(role: UserRole, id: i64) -> String {
    format!("{} account not found with id: {}", role, id)
}

fn write_error(err: DbErr, username: &str) -> AppError {
    let kind = err.sql_err();
    classify_write_error(kind, err, username)
}

/// Unique-constraint violations that slip past the pre-checks are still
/// business-rule failures, not database faults.
fn classify_write_error(kind: Option<SqlErr>, err: DbErr, username: &str) -> AppError {
    match kind {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!(username = %username, detail = %detail, "Unique constraint violated");
            AppError::business_rule(format!("Username or email already exists: {}", username))
        }
        _ => AppError::Database(err),
    }
}

macro_rules! sea_role_store {
    ($(#[$meta:meta])* $store:ident, $entity:ident, $role:expr) => {
        $(#[$meta])*
        pub struct $store {
            db: DatabaseConnection,
        }

        impl $store {
            pub fn new(db: DatabaseConnection) -> Self {
                Self { db }
            }
        }

        #[async_trait]
        impl RoleStore for $store {
            fn role(&self) -> UserRole {
                $role
            }

            async fn create(&self, account: NewAccount) -> AppResult<UserAccount> {
                account.ensure_storable()?;
                if self.exists_by_username(&account.username).await? {
                    return Err(username_taken(&account.username));
                }
                if self.exists_by_email(&account.email).await? {
                    return Err(email_taken(&account.email));
                }

                let username = account.username.clone();
                let active: $entity::ActiveModel = account.into();
                let model = active
                    .insert(&self.db)
                    .await
                    .map_err(|e| write_error(e, &username))?;

                tracing::info!(role = %self.role(), id = model.id, username = %model.username, "Account created");
                Ok(model.into())
            }

            async fn find_by_id(&self, id: i64) -> AppResult<Option<UserAccount>> {
                let model = $entity::Entity::find_by_id(id).one(&self.db).await?;
                Ok(model.map(UserAccount::from))
            }

            async fn find_by_username(&self, username: &str) -> AppResult<Option<UserAccount>> {
                let model = $entity::Entity::find()
                    .filter($entity::Column::Username.eq(username))
                    .one(&self.db)
                    .await?;
                Ok(model.map(UserAccount::from))
            }

            async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
                let count = $entity::Entity::find()
                    .filter($entity::Column::Username.eq(username))
                    .count(&self.db)
                    .await?;
                Ok(count > 0)
            }

            async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
                let count = $entity::Entity::find()
                    .filter($entity::Column::Email.eq(email))
                    .count(&self.db)
                    .await?;
                Ok(count > 0)
            }

            async fn update(&self, account: UserAccount) -> AppResult<UserAccount> {
                let model = $entity::Entity::find_by_id(account.id)
                    .one(&self.db)
                    .await?
                    .ok_or_not_found(|| account_not_found(self.role(), account.id))?;

                let mut active: $entity::ActiveModel = model.into();
                $entity::apply(&mut active, &account);
                let model = active
                    .update(&self.db)
                    .await
                    .map_err(|e| write_error(e, &account.username))?;

                Ok(model.into())
            }

            async fn delete(&self, id: i64) -> AppResult<()> {
                let result = $entity::Entity::delete_by_id(id).exec(&self.db).await?;
                if result.rows_affected == 0 {
                    return Err(AppError::not_found(account_not_found(self.role(), id)));
                }

                tracing::info!(role = %self.role(), id, "Account deleted");
                Ok(())
            }

            async fn list(&self) -> AppResult<Vec<UserAccount>> {
                let models = $entity::Entity::find()
                    .order_by_asc($entity::Column::Id)
                    .all(&self.db)
                    .await?;
                Ok(models.into_iter().map(UserAccount::from).collect())
            }

            async fn count(&self) -> AppResult<u64> {
                Ok($entity::Entity::find().count(&self.db).await?)
            }
        }
    };
}

sea_role_store!(
    /// Customer accounts backed by the `customers` table
    CustomerStore,
    customer,
    UserRole::Customer
);

sea_role_store!(
    /// Artist accounts backed by the `artists` table
    ArtistStore,
    artist,
    UserRole::Artist
);

sea_role_store!(
    /// Admin accounts backed by the `admins` table
    AdminStore,
    admin,
    UserRole::Admin
);

sea_role_store!(
    /// Staff accounts backed by the `staff` table
    StaffStore,
    staff,
    UserRole::Staff
);
