//! In-memory stores shared by the integration tests.
//!
//! They follow the same contracts as the SeaORM stores: uniqueness is
//! checked within one store only, ids are per-store sequences, and the
//! audit repository lists newest first with the id as tie-break.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use admin_directory::domain::{
    ActionCount, AuditEntry, AuditFilter, CreateUser, NewAccount, NewAuditEntry, PasswordHasher,
    UserAccount, UserRole,
};
use admin_directory::errors::{AppError, AppResult};
use admin_directory::infra::{AuditRepository, RoleStore};
use admin_directory::services::{Directory, RoleRegistry};

// =============================================================================
// Role stores
// =============================================================================

pub struct MemoryRoleStore {
    role: UserRole,
    accounts: Mutex<Vec<UserAccount>>,
    next_id: AtomicI64,
}

impl MemoryRoleStore {
    pub fn new(role: UserRole) -> Self {
        Self {
            role,
            accounts: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, Vec<UserAccount>> {
        self.accounts.lock().unwrap()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    fn role(&self) -> UserRole {
        self.role
    }

    async fn create(&self, account: NewAccount) -> AppResult<UserAccount> {
        account.ensure_storable()?;
        let mut accounts = self.accounts();
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(AppError::business_rule(format!(
                "Username already exists: {}",
                account.username
            )));
        }
        if accounts.iter().any(|a| a.email == account.email) {
            return Err(AppError::business_rule(format!(
                "Email already exists: {}",
                account.email
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = account.into_account(id, Utc::now());
        accounts.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<UserAccount>> {
        Ok(self.accounts().iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserAccount>> {
        Ok(self
            .accounts()
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        Ok(self.accounts().iter().any(|a| a.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.accounts().iter().any(|a| a.email == email))
    }

    async fn update(&self, account: UserAccount) -> AppResult<UserAccount> {
        let mut accounts = self.accounts();
        let slot = accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or_else(|| AppError::not_found(format!("No account {}", account.id)))?;
        *slot = account.clone();
        Ok(account)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut accounts = self.accounts();
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() == before {
            return Err(AppError::not_found(format!("No account {}", id)));
        }
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<UserAccount>> {
        Ok(self.accounts().clone())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.accounts().len() as u64)
    }
}

/// Handles to the four stores behind a test directory.
pub struct Stores {
    pub customer: Arc<MemoryRoleStore>,
    pub artist: Arc<MemoryRoleStore>,
    pub admin: Arc<MemoryRoleStore>,
    pub staff: Arc<MemoryRoleStore>,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            customer: Arc::new(MemoryRoleStore::new(UserRole::Customer)),
            artist: Arc::new(MemoryRoleStore::new(UserRole::Artist)),
            admin: Arc::new(MemoryRoleStore::new(UserRole::Admin)),
            staff: Arc::new(MemoryRoleStore::new(UserRole::Staff)),
        }
    }

    pub fn registry(&self) -> RoleRegistry {
        RoleRegistry::new(
            self.customer.clone(),
            self.artist.clone(),
            self.admin.clone(),
            self.staff.clone(),
        )
    }
}

/// Cheap deterministic hasher; argon2 is exercised by the unit tests.
pub struct TestHasher;

impl PasswordHasher for TestHasher {
    fn hash(&self, plain_text: &str) -> AppResult<String> {
        Ok(format!("test-hash${}", plain_text.len()))
    }
}

pub fn directory() -> (Directory, Stores) {
    let stores = Stores::new();
    let directory = Directory::new(stores.registry(), Arc::new(TestHasher));
    (directory, stores)
}

pub fn create_request(username: &str, role: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        password: "s3cret-pass".to_string(),
        email: format!("{}@example.com", username),
        role: role.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some(username.to_string()),
        artist_name: None,
        photo_url: None,
    }
}

// =============================================================================
// Audit repository
// =============================================================================

#[derive(Default)]
pub struct MemoryAuditRepository {
    entries: Mutex<Vec<AuditEntry>>,
    next_id: AtomicI64,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry in insertion order.
    pub fn all(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn newest_first(&self, keep: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        entries
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn insert(&self, entry: NewAuditEntry) -> AppResult<AuditEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = entry.into_entry(id);
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn search(
        &self,
        filter: AuditFilter,
        page: u64,
        size: u64,
    ) -> AppResult<(Vec<AuditEntry>, u64)> {
        let matching = self.newest_first(|e| filter.matches(e));
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .collect();
        Ok((data, total))
    }

    async fn failed_since(
        &self,
        admin_username: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEntry>> {
        Ok(self.newest_first(|e| {
            e.admin_username == admin_username && !e.success && e.timestamp >= since
        }))
    }

    async fn action_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<ActionCount>> {
        let mut counts: Vec<ActionCount> = Vec::new();
        for entry in self.newest_first(|e| e.timestamp >= from && e.timestamp <= to) {
            match counts.iter_mut().find(|c| c.action == entry.action) {
                Some(count) => count.count += 1,
                None => counts.push(ActionCount {
                    action: entry.action,
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }

    async fn count_by_admin_between(
        &self,
        admin_username: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64> {
        Ok(self
            .newest_first(|e| {
                e.admin_username == admin_username && e.timestamp >= from && e.timestamp <= to
            })
            .len() as u64)
    }
}
