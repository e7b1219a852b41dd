//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{audit_handler, user_handler};
use crate::domain::{
    ActionCount, AuditEntry, CreateUser, Severity, UserCounts, UserResponse, UserRole, UserUpdate,
};
use crate::types::{AuditPage, MessageResponse, PaginationMeta, UserPage};

/// OpenAPI documentation for the admin directory
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Admin Directory",
        version = "0.1.0",
        description = "Administrative user directory over four role stores, with an audit ledger"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // User endpoints
        user_handler::create_user,
        user_handler::list_users,
        user_handler::search_users,
        user_handler::username_availability,
        user_handler::user_counts,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::update_user_status,
        user_handler::delete_user,
        user_handler::delete_user_in_role,
        // Audit endpoints
        audit_handler::list_audit_logs,
        audit_handler::failed_actions,
        audit_handler::action_summary,
    ),
    components(
        schemas(
            // Domain types
            UserRole,
            UserResponse,
            CreateUser,
            UserUpdate,
            UserCounts,
            Severity,
            AuditEntry,
            ActionCount,
            // Shared types
            UserPage,
            AuditPage,
            PaginationMeta,
            MessageResponse,
            // Handler types
            user_handler::Availability,
            user_handler::StatusUpdate,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Account management across every role"),
        (name = "Audit", description = "Audit ledger queries")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT with role ADMIN"))
                        .build(),
                ),
            );
        }
    }
}
