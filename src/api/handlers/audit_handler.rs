//! Audit log query handlers.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::extractors::ClientContext;
use crate::api::middleware::CurrentAdmin;
use crate::api::AppState;
use crate::config::{ACTION_VIEW_AUDIT_ANALYTICS, ACTION_VIEW_AUDIT_LOGS, RESOURCE_AUDIT};
use crate::domain::{ActionCount, AuditEntry, AuditFilter, Severity};
use crate::errors::{ActionFailure, AppResult};
use crate::services::{AdminAction, Summary};
use crate::types::{AuditPage, PaginationParams};

/// Optional audit log filters, combined with AND
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogFilter {
    pub admin_username: Option<String>,
    /// Action tag, e.g. CREATE_USER
    pub action: Option<String>,
    pub resource_type: Option<String>,
    /// LOW, MEDIUM, HIGH or CRITICAL
    pub severity: Option<String>,
    pub success: Option<bool>,
}

impl AuditLogFilter {
    fn into_filter(self) -> AppResult<AuditFilter> {
        let severity = self
            .severity
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()?;

        Ok(AuditFilter {
            admin_username: self.admin_username,
            action: self.action,
            resource_type: self.resource_type,
            severity,
            success: self.success,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FailureQuery {
    pub admin_username: String,
    /// RFC 3339 instant
    pub since: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    /// RFC 3339 instant, inclusive
    pub from: DateTime<Utc>,
    /// RFC 3339 instant, inclusive
    pub to: DateTime<Utc>,
}

/// Create audit log routes
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(list_audit_logs))
        .route("/audit-logs/failures", get(failed_actions))
        .route("/audit-logs/summary", get(action_summary))
}

fn audit_action(admin: &CurrentAdmin, action: &'static str, ctx: ClientContext) -> AdminAction {
    AdminAction::new(admin.username.clone(), action, RESOURCE_AUDIT, ctx.0)
}

/// Page through audit entries, newest first
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    tag = "Audit",
    params(PaginationParams, AuditLogFilter),
    responses(
        (status = 200, description = "One page of entries", body = AuditPage),
        (status = 400, description = "Invalid page or filter")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<AuditLogFilter>,
) -> Result<Json<AuditPage>, ActionFailure> {
    let action = audit_action(&admin, ACTION_VIEW_AUDIT_LOGS, ctx);
    let ledger = state.audit.clone();
    let (page, size) = (params.page, params.size);

    let entries = state
        .envelope
        .run(
            action,
            async move {
                let filter = filter.into_filter()?;
                ledger.search(filter, page, size).await
            },
            |_| Summary::new(format!("Viewed audit logs page {}", page)),
        )
        .await?;

    Ok(Json(entries))
}

/// Failed actions by one admin since an instant
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs/failures",
    tag = "Audit",
    params(FailureQuery),
    responses(
        (status = 200, description = "Failed entries, newest first", body = Vec<AuditEntry>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn failed_actions(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(query): Query<FailureQuery>,
) -> Result<Json<Vec<AuditEntry>>, ActionFailure> {
    let action = audit_action(&admin, ACTION_VIEW_AUDIT_LOGS, ctx);

    let entries = state
        .envelope
        .run(
            action,
            state
                .audit
                .failed_actions_since(&query.admin_username, query.since),
            |entries| {
                Summary::new(format!(
                    "Viewed {} failed actions of: {}",
                    entries.len(),
                    query.admin_username
                ))
            },
        )
        .await?;

    Ok(Json(entries))
}

/// Entry counts per action tag within a window
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs/summary",
    tag = "Audit",
    params(WindowQuery),
    responses(
        (status = 200, description = "Counts, highest first", body = Vec<ActionCount>),
        (status = 400, description = "Inverted window")
    ),
    security(("bearer_auth" = []))
)]
pub async fn action_summary(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(window): Query<WindowQuery>,
) -> Result<Json<Vec<ActionCount>>, ActionFailure> {
    let action = audit_action(&admin, ACTION_VIEW_AUDIT_ANALYTICS, ctx);

    let counts = state
        .envelope
        .run(
            action,
            state.audit.action_summary(window.from, window.to),
            |_| {
                Summary::new(format!(
                    "Viewed action summary from {} to {}",
                    window.from.to_rfc3339(),
                    window.to.to_rfc3339()
                ))
            },
        )
        .await?;

    Ok(Json(counts))
}
