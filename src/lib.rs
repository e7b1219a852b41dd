//! Admin Directory - user administration over role-partitioned stores
//!
//! Customers, artists, admins and staff live in four separate stores. This
//! crate presents them as one directory and records every administrative
//! action in an audit ledger.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Accounts, roles and audit entries
//! - **services**: Directory, audit ledger, action envelope, token verification
//! - **infra**: Database, migrations, role stores, Redis lock
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! admin-directory serve
//!
//! # Run migrations
//! admin-directory migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{UserAccount, UserRole};
pub use errors::{AppError, AppResult};
pub use services::{ActionEnvelope, AuditLedger, UserDirectory};
