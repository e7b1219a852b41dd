//! Application state - Dependency injection container.
//!
//! Provides centralized access to the directory, the audit ledger and
//! infrastructure handles used by health probes.

use std::sync::Arc;

use crate::infra::{Cache, Database};
use crate::services::{ActionEnvelope, AuditLedger, AuthService, UserDirectory};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Unified account directory
    pub directory: Arc<dyn UserDirectory>,
    /// Audit ledger, queried directly by the audit endpoints
    pub audit: Arc<dyn AuditLedger>,
    /// Wraps every admin call with one ledger entry
    pub envelope: ActionEnvelope,
    /// Bearer token verification
    pub auth_service: Arc<dyn AuthService>,
    /// Database handle for health probes (absent in tests)
    pub database: Option<Arc<Database>>,
    /// Redis handle for health probes (absent when not configured)
    pub cache: Option<Arc<Cache>>,
}

impl AppState {
    /// Create state from injected services. The envelope records into `audit`.
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditLedger>,
        auth_service: Arc<dyn AuthService>,
    ) -> Self {
        Self {
            envelope: ActionEnvelope::new(audit.clone()),
            directory,
            audit,
            auth_service,
            database: None,
            cache: None,
        }
    }

    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }
}
