//! Repository layer - Data access abstraction
//!
//! Role stores hold the four account partitions; the audit repository holds
//! the append-only ledger.

mod audit_repository;
pub(crate) mod entities;
mod role_store;

pub use audit_repository::{AuditRepository, AuditStore};
pub use role_store::{AdminStore, ArtistStore, CustomerStore, RoleStore, StaffStore};

pub(crate) use role_store::username_taken;

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use audit_repository::MockAuditRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use role_store::MockRoleStore;
