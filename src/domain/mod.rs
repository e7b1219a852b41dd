//! Domain layer - Core business entities and logic
//!
//! Account and audit types that are independent of storage and transport.

pub mod audit;
pub mod password;
pub mod user;

pub use audit::{
    ActionCount, AuditEntry, AuditFilter, AuditRecord, NewAuditEntry, RequestContext, Severity,
};
pub use password::{Argon2Hasher, Password, PasswordHasher};
pub use user::{
    AccountProfile, CreateUser, NewAccount, UserAccount, UserCounts, UserResponse, UserRole,
    UserUpdate,
};
