//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure. They depend on
//! abstractions (traits) so handlers and tests can swap implementations.

mod audit_service;
mod auth_service;
pub mod directory;
mod envelope;

pub use audit_service::{AuditLedger, AuditService, AuditWriter};
pub use auth_service::{AuthService, Claims, JwtAuthenticator};
pub use directory::{Directory, RoleRegistry, UserDirectory, LISTING_ORDER, RESOLUTION_ORDER};
pub use envelope::{ActionEnvelope, AdminAction, Summary};

#[cfg(any(test, feature = "test-utils"))]
pub use audit_service::MockAuditLedger;
