//! Infrastructure layer - External systems integration
//!
//! - Database connections, migrations and repositories
//! - Redis for distributed username locks

pub mod cache;
pub mod db;
pub mod repositories;

pub use cache::{Cache, LockToken, UsernameLock};
pub use db::{Database, Migrator};
pub use repositories::{
    AdminStore, ArtistStore, AuditRepository, AuditStore, CustomerStore, RoleStore, StaffStore,
};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockUsernameLock;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockAuditRepository, MockRoleStore};
