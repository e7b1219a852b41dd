//! SeaORM entity for the append-only `audit_logs` table.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};

use crate::domain::{AuditEntry, NewAuditEntry, Severity};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub admin_username: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub target_user_id: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub success: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub severity: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AuditEntry {
    fn from(model: Model) -> Self {
        // Rows are only written through this crate; an unrecognised value
        // means a manual edit, which is surfaced as MEDIUM rather than lost.
        let severity = model.severity.parse().unwrap_or(Severity::Medium);

        Self {
            id: model.id,
            admin_username: model.admin_username,
            action: model.action,
            resource_type: model.resource_type,
            resource_id: model.resource_id,
            target_user_id: model.target_user_id,
            details: model.details,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            session_id: model.session_id,
            success: model.success,
            error_message: model.error_message,
            severity,
            timestamp: model.timestamp,
        }
    }
}

impl From<NewAuditEntry> for ActiveModel {
    fn from(entry: NewAuditEntry) -> Self {
        Self {
            id: NotSet,
            admin_username: Set(entry.admin_username),
            action: Set(entry.action),
            resource_type: Set(entry.resource_type),
            resource_id: Set(entry.resource_id),
            target_user_id: Set(entry.target_user_id),
            details: Set(entry.details),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            session_id: Set(entry.session_id),
            success: Set(entry.success),
            error_message: Set(entry.error_message),
            severity: Set(entry.severity.as_str().to_string()),
            timestamp: Set(entry.timestamp),
        }
    }
}
