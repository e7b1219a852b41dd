//! SeaORM entity for the `artists` table.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};

use crate::domain::{AccountProfile, NewAccount, UserAccount};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "artists")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub artist_name: Option<String>,
    pub photo_url: Option<String>,
    pub enabled: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UserAccount {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            first_name: model.first_name,
            last_name: model.last_name,
            enabled: model.enabled,
            created_at: model.created_at,
            profile: AccountProfile::Artist {
                artist_name: model.artist_name,
                photo_url: model.photo_url,
            },
        }
    }
}

impl From<NewAccount> for ActiveModel {
    fn from(account: NewAccount) -> Self {
        let (artist_name, photo_url) = match account.profile {
            AccountProfile::Artist {
                artist_name,
                photo_url,
            } => (artist_name, photo_url),
            _ => (None, None),
        };

        Self {
            id: NotSet,
            username: Set(account.username),
            email: Set(account.email),
            password_hash: Set(account.password_hash),
            first_name: Set(account.first_name),
            last_name: Set(account.last_name),
            artist_name: Set(artist_name),
            photo_url: Set(photo_url),
            enabled: Set(true),
            created_at: Set(chrono::Utc::now()),
        }
    }
}

/// Copy mutable account fields onto a loaded row.
pub fn apply(active: &mut ActiveModel, account: &UserAccount) {
    active.email = Set(account.email.clone());
    active.password_hash = Set(account.password_hash.clone());
    active.first_name = Set(account.first_name.clone());
    active.last_name = Set(account.last_name.clone());
    active.enabled = Set(account.enabled);
    active.artist_name = Set(account.artist_name().map(str::to_string));
    active.photo_url = Set(account.photo_url().map(str::to_string));
}
