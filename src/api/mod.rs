//! API layer - HTTP handlers and middleware
//!
//! - Request handlers for accounts and audit logs
//! - JWT admin authentication
//! - Custom extractors
//! - Route definitions

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
