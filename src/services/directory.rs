//! User directory - one account surface over four role stores.
//!
//! Account ids are only unique within a store, so id lookups probe the
//! stores in a fixed order and the first hit wins. Username uniqueness
//! across stores is checked sequentially and is not atomic with creation
//! unless a [`UsernameLock`] is configured.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{
    AccountProfile, CreateUser, NewAccount, PasswordHasher, UserAccount, UserCounts, UserRole,
    UserUpdate,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::repositories::username_taken;
use crate::infra::{
    AdminStore, ArtistStore, CustomerStore, RoleStore, StaffStore, UsernameLock,
};
use crate::types::{PageRequest, Paginated};

/// Probe order for resolving an account by id or username.
pub const RESOLUTION_ORDER: [UserRole; 4] = [
    UserRole::Customer,
    UserRole::Artist,
    UserRole::Staff,
    UserRole::Admin,
];

/// Order used for listings, search and availability checks.
pub const LISTING_ORDER: [UserRole; 4] = [
    UserRole::Customer,
    UserRole::Artist,
    UserRole::Admin,
    UserRole::Staff,
];

/// Maps each role to the store holding its accounts.
#[derive(Clone)]
pub struct RoleRegistry {
    customer: Arc<dyn RoleStore>,
    artist: Arc<dyn RoleStore>,
    admin: Arc<dyn RoleStore>,
    staff: Arc<dyn RoleStore>,
}

impl RoleRegistry {
    pub fn new(
        customer: Arc<dyn RoleStore>,
        artist: Arc<dyn RoleStore>,
        admin: Arc<dyn RoleStore>,
        staff: Arc<dyn RoleStore>,
    ) -> Self {
        Self {
            customer,
            artist,
            admin,
            staff,
        }
    }

    /// Registry over the SeaORM-backed stores.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self::new(
            Arc::new(CustomerStore::new(db.clone())),
            Arc::new(ArtistStore::new(db.clone())),
            Arc::new(AdminStore::new(db.clone())),
            Arc::new(StaffStore::new(db)),
        )
    }

    pub fn store(&self, role: UserRole) -> &dyn RoleStore {
        match role {
            UserRole::Customer => self.customer.as_ref(),
            UserRole::Artist => self.artist.as_ref(),
            UserRole::Admin => self.admin.as_ref(),
            UserRole::Staff => self.staff.as_ref(),
        }
    }
}

/// Unified account operations across all roles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create an account in the store matching `request.role`
    async fn create_user(&self, request: CreateUser) -> AppResult<UserAccount>;

    /// First account with this id in resolution order
    async fn get_user_by_id(&self, id: i64) -> AppResult<UserAccount>;

    /// Look up a username inside one role's store
    async fn find_user_by_username(&self, username: &str, role: &str) -> AppResult<UserAccount>;

    /// First account with this username in resolution order
    async fn resolve_user_by_username(&self, username: &str) -> AppResult<UserAccount>;

    /// Merge-patch an account resolved by id
    async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<UserAccount>;

    async fn update_user_status(&self, id: i64, enabled: bool) -> AppResult<UserAccount>;

    /// Delete an account resolved by id. Only admin and staff accounts can be deleted.
    async fn delete_user(&self, id: i64) -> AppResult<UserRole>;

    /// Delete by id within an explicit role, without probing other stores
    async fn delete_user_in_role(&self, id: i64, role: &str) -> AppResult<()>;

    /// One page over the union of all stores, or over a single role
    async fn get_all_users(
        &self,
        page: i64,
        size: i64,
        role: Option<&str>,
    ) -> AppResult<Paginated<UserAccount>>;

    async fn list_all_users(&self) -> AppResult<Vec<UserAccount>>;

    async fn search_users(&self, term: &str) -> AppResult<Vec<UserAccount>>;

    /// False when the username exists in any store, or when a store cannot answer
    async fn is_username_available(&self, username: &str) -> bool;

    async fn user_counts(&self) -> AppResult<UserCounts>;
}

/// Default [`UserDirectory`] implementation.
pub struct Directory {
    stores: RoleRegistry,
    hasher: Arc<dyn PasswordHasher>,
    username_lock: Option<Arc<dyn UsernameLock>>,
}

impl Directory {
    pub fn new(stores: RoleRegistry, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            stores,
            hasher,
            username_lock: None,
        }
    }

    /// Serialize creations per username and check every store under the lock.
    pub fn with_username_lock(mut self, lock: Arc<dyn UsernameLock>) -> Self {
        self.username_lock = Some(lock);
        self
    }

    async fn insert_account(
        &self,
        role: UserRole,
        request: CreateUser,
        check_all_stores: bool,
    ) -> AppResult<UserAccount> {
        if check_all_stores && self.username_exists_anywhere(&request.username).await? {
            return Err(username_taken(&request.username));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let account = NewAccount {
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            profile: AccountProfile::for_role(role, request.artist_name, request.photo_url),
        };

        let created = self.stores.store(role).create(account).await?;
        tracing::info!(id = created.id, username = %created.username, role = %role, "User created");
        Ok(created)
    }

    /// Strict existence probe; store errors propagate.
    async fn username_exists_anywhere(&self, username: &str) -> AppResult<bool> {
        for role in LISTING_ORDER {
            if self.stores.store(role).exists_by_username(username).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete_in_role(&self, id: i64, role: UserRole) -> AppResult<()> {
        match role {
            UserRole::Customer => Err(AppError::business_rule(
                "Customer deletion not implemented",
            )),
            UserRole::Artist => Err(AppError::business_rule(
                "Artist deletion not fully implemented - requires handling of associated content",
            )),
            UserRole::Admin | UserRole::Staff => {
                self.stores.store(role).delete(id).await?;
                tracing::info!(id, role = %role, "User deleted");
                Ok(())
            }
        }
    }
}

fn require_present(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!(
            "{} cannot be null or empty",
            field
        )));
    }
    Ok(())
}

#[async_trait]
impl UserDirectory for Directory {
    async fn create_user(&self, request: CreateUser) -> AppResult<UserAccount> {
        require_present(&request.username, "Username")?;
        require_present(&request.password, "Password")?;
        require_present(&request.role, "Role")?;
        let role = UserRole::parse(&request.role)?;

        let Some(lock) = &self.username_lock else {
            return self.insert_account(role, request, false).await;
        };

        let token = lock.acquire(&request.username).await?;
        let result = self.insert_account(role, request, true).await;
        if let Err(e) = lock.release(token).await {
            tracing::warn!(error = %e, "Failed to release username lock");
        }
        result
    }

    async fn get_user_by_id(&self, id: i64) -> AppResult<UserAccount> {
        for role in RESOLUTION_ORDER {
            match self.stores.store(role).find_by_id(id).await {
                Ok(Some(account)) => return Ok(account),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(id, role = %role, error = ?e, "Store lookup failed, continuing probe")
                }
            }
        }

        Err(AppError::validation(format!("User not found with id: {}", id)))
    }

    async fn find_user_by_username(&self, username: &str, role: &str) -> AppResult<UserAccount> {
        require_present(username, "Username")?;
        require_present(role, "Role")?;
        let role = UserRole::parse(role)?;

        self.stores
            .store(role)
            .find_by_username(username)
            .await?
            .ok_or_not_found(|| format!("User not found with username: {}", username))
    }

    async fn resolve_user_by_username(&self, username: &str) -> AppResult<UserAccount> {
        require_present(username, "Username")?;

        for role in RESOLUTION_ORDER {
            match self.stores.store(role).find_by_username(username).await {
                Ok(Some(account)) => return Ok(account),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(username = %username, role = %role, error = ?e, "Store lookup failed, continuing probe")
                }
            }
        }

        Err(AppError::validation(format!(
            "User not found with username: {}",
            username
        )))
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<UserAccount> {
        let mut account = self.get_user_by_id(id).await?;
        let role = account.role();

        account.apply_update(&update);
        if let Some(password) = update.new_password() {
            account.password_hash = self.hasher.hash(password)?;
        }

        let updated = self.stores.store(role).update(account).await?;
        tracing::info!(id, role = %role, "User updated");
        Ok(updated)
    }

    async fn update_user_status(&self, id: i64, enabled: bool) -> AppResult<UserAccount> {
        let mut account = self.get_user_by_id(id).await?;
        let role = account.role();

        account.enabled = enabled;
        let updated = self.stores.store(role).update(account).await?;
        tracing::info!(id, role = %role, enabled, "User status changed");
        Ok(updated)
    }

    async fn delete_user(&self, id: i64) -> AppResult<UserRole> {
        let role = self.get_user_by_id(id).await?.role();
        self.delete_in_role(id, role).await?;
        Ok(role)
    }

    async fn delete_user_in_role(&self, id: i64, role: &str) -> AppResult<()> {
        require_present(role, "Role")?;
        let role = UserRole::parse(role)?;
        self.delete_in_role(id, role).await
    }

    async fn get_all_users(
        &self,
        page: i64,
        size: i64,
        role: Option<&str>,
    ) -> AppResult<Paginated<UserAccount>> {
        let request = PageRequest::new(page, size)?;

        // Full materialization: cost is linear in the total number of accounts.
        let accounts = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(tag) => {
                let role = UserRole::parse(tag)?;
                self.stores.store(role).list().await?
            }
            None => self.list_all_users().await?,
        };

        Ok(Paginated::slice(accounts, request))
    }

    async fn list_all_users(&self) -> AppResult<Vec<UserAccount>> {
        let mut accounts = Vec::new();
        for role in LISTING_ORDER {
            accounts.extend(self.stores.store(role).list().await?);
        }
        Ok(accounts)
    }

    async fn search_users(&self, term: &str) -> AppResult<Vec<UserAccount>> {
        require_present(term, "Search term")?;
        let needle = term.trim().to_lowercase();

        let accounts = self.list_all_users().await?;
        Ok(accounts
            .into_iter()
            .filter(|account| account.matches(&needle))
            .collect())
    }

    async fn is_username_available(&self, username: &str) -> bool {
        if username.trim().is_empty() {
            return false;
        }

        for role in LISTING_ORDER {
            match self.stores.store(role).exists_by_username(username).await {
                Ok(false) => {}
                Ok(true) => return false,
                Err(e) => {
                    tracing::warn!(username = %username, role = %role, error = ?e, "Availability check failed");
                    return false;
                }
            }
        }

        true
    }

    async fn user_counts(&self) -> AppResult<UserCounts> {
        let (customers, artists, admins, staff) = futures::try_join!(
            self.stores.store(UserRole::Customer).count(),
            self.stores.store(UserRole::Artist).count(),
            self.stores.store(UserRole::Admin).count(),
            self.stores.store(UserRole::Staff).count(),
        )?;

        Ok(UserCounts {
            customers,
            artists,
            admins,
            staff,
            total: customers + artists + admins + staff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{LockToken, MockRoleStore, MockUsernameLock};
    use chrono::Utc;
    use mockall::predicate::eq;

    /// Deterministic hasher so tests can assert on stored hashes.
    struct ReversingHasher;

    impl PasswordHasher for ReversingHasher {
        fn hash(&self, plain_text: &str) -> AppResult<String> {
            Ok(format!("hashed:{}", plain_text.chars().rev().collect::<String>()))
        }
    }

    fn account(id: i64, username: &str, profile: AccountProfile) -> UserAccount {
        UserAccount {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "old-hash".to_string(),
            first_name: None,
            last_name: None,
            enabled: true,
            created_at: Utc::now(),
            profile,
        }
    }

    fn request(username: &str, role: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            password: "s3cret".to_string(),
            email: format!("{}@example.com", username),
            role: role.to_string(),
            first_name: None,
            last_name: None,
            artist_name: Some("Stage Name".to_string()),
            photo_url: None,
        }
    }

    struct Mocks {
        customer: MockRoleStore,
        artist: MockRoleStore,
        admin: MockRoleStore,
        staff: MockRoleStore,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                customer: MockRoleStore::new(),
                artist: MockRoleStore::new(),
                admin: MockRoleStore::new(),
                staff: MockRoleStore::new(),
            }
        }

        fn directory(self) -> Directory {
            let registry = RoleRegistry::new(
                Arc::new(self.customer),
                Arc::new(self.artist),
                Arc::new(self.admin),
                Arc::new(self.staff),
            );
            Directory::new(registry, Arc::new(ReversingHasher))
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_once_and_routes_by_role() {
        let mut mocks = Mocks::new();
        mocks
            .artist
            .expect_create()
            .withf(|new| {
                new.password_hash == "hashed:terc3s"
                    && new.profile
                        == AccountProfile::Artist {
                            artist_name: Some("Stage Name".to_string()),
                            photo_url: None,
                        }
            })
            .times(1)
            .returning(|new| Ok(new.into_account(7, Utc::now())));

        let created = mocks
            .directory()
            .create_user(request("nova", "artist"))
            .await
            .unwrap();

        assert_eq!(created.role(), UserRole::Artist);
        assert_ne!(created.password_hash, "s3cret");
    }

    #[tokio::test]
    async fn test_create_user_rejects_blank_fields() {
        let directory = Mocks::new().directory();

        let err = directory.create_user(request("  ", "ADMIN")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Username cannot be null or empty"));

        let mut blank_password = request("bob", "ADMIN");
        blank_password.password = String::new();
        let err = directory.create_user(blank_password).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Password cannot be null or empty"));

        let err = directory.create_user(request("bob", "")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Role cannot be null or empty"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_unknown_role() {
        let err = Mocks::new()
            .directory()
            .create_user(request("bob", "wizard"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Invalid role: wizard"));
    }

    #[tokio::test]
    async fn test_create_user_propagates_store_uniqueness_error() {
        let mut mocks = Mocks::new();
        mocks
            .staff
            .expect_create()
            .returning(|new| Err(username_taken(&new.username)));

        let err = mocks
            .directory()
            .create_user(request("bob", "STAFF"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg == "Username already exists: bob"));
    }

    #[tokio::test]
    async fn test_get_user_by_id_probe_order_first_hit_wins() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_find_by_id()
            .with(eq(3i64))
            .returning(|id| Ok(Some(account(id, "carol", AccountProfile::Customer))));
        // Later stores are never consulted once the customer store answers.
        mocks.artist.expect_find_by_id().never();
        mocks.staff.expect_find_by_id().never();
        mocks.admin.expect_find_by_id().never();

        let found = mocks.directory().get_user_by_id(3).await.unwrap();
        assert_eq!(found.role(), UserRole::Customer);
    }

    #[tokio::test]
    async fn test_get_user_by_id_skips_failing_store() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_find_by_id()
            .returning(|_| Err(AppError::internal("customer db down")));
        mocks.artist.expect_find_by_id().returning(|_| Ok(None));
        mocks
            .staff
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, "sam", AccountProfile::Staff))));

        let found = mocks.directory().get_user_by_id(9).await.unwrap();
        assert_eq!(found.role(), UserRole::Staff);
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found_is_validation_error() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_find_by_id().returning(|_| Ok(None));
        mocks.artist.expect_find_by_id().returning(|_| Ok(None));
        mocks.staff.expect_find_by_id().returning(|_| Ok(None));
        mocks.admin.expect_find_by_id().returning(|_| Ok(None));

        let err = mocks.directory().get_user_by_id(404).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "User not found with id: 404"));
    }

    #[tokio::test]
    async fn test_update_user_rehashes_password_and_targets_resolved_store() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_find_by_id().returning(|_| Ok(None));
        mocks.artist.expect_find_by_id().returning(|_| Ok(None));
        mocks.staff.expect_find_by_id().returning(|_| Ok(None));
        mocks
            .admin
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, "root", AccountProfile::Admin))));
        mocks
            .admin
            .expect_update()
            .withf(|a| a.password_hash == "hashed:wen" && a.last_name.as_deref() == Some("Smith"))
            .times(1)
            .returning(Ok);

        let update = UserUpdate {
            last_name: Some(Some("Smith".to_string())),
            password: Some("new".to_string()),
            ..Default::default()
        };
        let updated = mocks.directory().update_user(1, update).await.unwrap();
        assert_eq!(updated.username, "root");
    }

    #[tokio::test]
    async fn test_update_user_keeps_hash_when_password_empty() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, "carol", AccountProfile::Customer))));
        mocks
            .customer
            .expect_update()
            .withf(|a| a.password_hash == "old-hash")
            .returning(Ok);

        let update = UserUpdate {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(mocks.directory().update_user(1, update).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_user_status() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, "carol", AccountProfile::Customer))));
        mocks
            .customer
            .expect_update()
            .withf(|a| !a.enabled)
            .returning(Ok);

        let updated = mocks.directory().update_user_status(1, false).await.unwrap();
        assert!(!updated.enabled);
    }

    #[tokio::test]
    async fn test_delete_user_disallowed_for_customer_and_artist() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_find_by_id()
            .with(eq(1i64))
            .returning(|id| Ok(Some(account(id, "carol", AccountProfile::Customer))));
        mocks.customer.expect_find_by_id().returning(|_| Ok(None));
        mocks.customer.expect_delete().never();
        mocks.artist.expect_find_by_id().returning(|id| {
            Ok(Some(account(
                id,
                "nova",
                AccountProfile::Artist {
                    artist_name: None,
                    photo_url: None,
                },
            )))
        });
        mocks.artist.expect_delete().never();

        let directory = mocks.directory();
        let err = directory.delete_user(1).await.unwrap_err();
        assert!(err.is_business_rule());
        let err = directory.delete_user(2).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg.starts_with("Artist deletion")));
    }

    #[tokio::test]
    async fn test_delete_user_removes_staff() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_find_by_id().returning(|_| Ok(None));
        mocks.artist.expect_find_by_id().returning(|_| Ok(None));
        mocks
            .staff
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, "sam", AccountProfile::Staff))));
        mocks.staff.expect_delete().with(eq(5i64)).times(1).returning(|_| Ok(()));

        let role = mocks.directory().delete_user(5).await.unwrap();
        assert_eq!(role, UserRole::Staff);
    }

    #[tokio::test]
    async fn test_delete_user_in_role_does_not_probe() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_find_by_id().never();
        mocks.admin.expect_delete().with(eq(2i64)).times(1).returning(|_| Ok(()));

        let directory = mocks.directory();
        assert!(directory.delete_user_in_role(2, "admin").await.is_ok());
        let err = directory.delete_user_in_role(2, "customer").await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg == "Customer deletion not implemented"));
        let err = directory.delete_user_in_role(2, "nobody").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_get_all_users_validates_page_bounds() {
        let directory = Mocks::new().directory();

        let err = directory.get_all_users(-1, 10, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Page number cannot be negative"));
        let err = directory.get_all_users(0, 0, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Page size must be positive"));
        let err = directory.get_all_users(0, 10, Some("pirate")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_get_all_users_unions_in_listing_order() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_list()
            .returning(|| Ok(vec![account(1, "c1", AccountProfile::Customer)]));
        mocks.artist.expect_list().returning(|| Ok(vec![]));
        mocks
            .admin
            .expect_list()
            .returning(|| Ok(vec![account(1, "a1", AccountProfile::Admin)]));
        mocks
            .staff
            .expect_list()
            .returning(|| Ok(vec![account(1, "s1", AccountProfile::Staff)]));

        let page = mocks.directory().get_all_users(0, 2, None).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["c1", "a1"]);
        assert_eq!(page.meta.total, 3);
    }

    #[tokio::test]
    async fn test_get_all_users_with_role_filter_reads_one_store() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_list().never();
        mocks
            .staff
            .expect_list()
            .returning(|| Ok(vec![account(1, "s1", AccountProfile::Staff)]));

        let page = mocks
            .directory()
            .get_all_users(0, 10, Some("Staff"))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
    }

    #[tokio::test]
    async fn test_search_users_requires_term() {
        let err = Mocks::new().directory().search_users(" ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Search term cannot be null or empty"));
    }

    #[tokio::test]
    async fn test_is_username_available_fails_closed() {
        let mut mocks = Mocks::new();
        mocks
            .customer
            .expect_exists_by_username()
            .returning(|_| Err(AppError::internal("timeout")));
        mocks.artist.expect_exists_by_username().never();

        assert!(!mocks.directory().is_username_available("ghost").await);
    }

    #[tokio::test]
    async fn test_is_username_available_blank_is_false() {
        assert!(!Mocks::new().directory().is_username_available("").await);
    }

    #[tokio::test]
    async fn test_user_counts_sums_stores() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_count().returning(|| Ok(4));
        mocks.artist.expect_count().returning(|| Ok(3));
        mocks.admin.expect_count().returning(|| Ok(2));
        mocks.staff.expect_count().returning(|| Ok(1));

        let counts = mocks.directory().user_counts().await.unwrap();
        assert_eq!(counts.total, 10);
        assert_eq!(counts.artists, 3);
    }

    #[tokio::test]
    async fn test_username_lock_blocks_cross_store_duplicate() {
        let mut mocks = Mocks::new();
        mocks.customer.expect_exists_by_username().returning(|_| Ok(false));
        mocks
            .artist
            .expect_exists_by_username()
            .with(eq("bob"))
            .returning(|_| Ok(true));
        mocks.admin.expect_create().never();

        let mut lock = MockUsernameLock::new();
        lock.expect_acquire()
            .with(eq("bob"))
            .times(1)
            .returning(|_| Ok(LockToken::new("lock:username:bob", "id-1")));
        lock.expect_release().times(1).returning(|_| Ok(()));

        let directory = mocks.directory().with_username_lock(Arc::new(lock));
        let err = directory.create_user(request("bob", "ADMIN")).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg == "Username already exists: bob"));
    }

    #[tokio::test]
    async fn test_username_lock_released_after_successful_create() {
        let mut mocks = Mocks::new();
        for store in [&mut mocks.customer, &mut mocks.artist, &mut mocks.admin, &mut mocks.staff] {
            store.expect_exists_by_username().returning(|_| Ok(false));
        }
        mocks
            .customer
            .expect_create()
            .returning(|new| Ok(new.into_account(1, Utc::now())));

        let mut lock = MockUsernameLock::new();
        lock.expect_acquire()
            .returning(|_| Ok(LockToken::new("lock:username:eve", "id-2")));
        lock.expect_release()
            .withf(|token| token.key() == "lock:username:eve")
            .times(1)
            .returning(|_| Ok(()));

        let directory = mocks.directory().with_username_lock(Arc::new(lock));
        assert!(directory.create_user(request("eve", "customer")).await.is_ok());
    }
}
