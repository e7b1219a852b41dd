//! Audit ledger domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::UNKNOWN_ADDRESS;
use crate::errors::AppError;

/// Coarse criticality of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Action-tag fragments and the severity they imply, in priority order.
const SEVERITY_RULES: &[(&[&str], Severity)] = &[
    (&["DELETE", "REFUND", "SHUTDOWN"], Severity::Critical),
    (&["CREATE", "UPDATE", "STATUS_CHANGE"], Severity::High),
    (&["VIEW", "GET", "ANALYTICS"], Severity::Low),
];

impl Severity {
    /// Severity of a successful action, derived from its tag. First rule wins.
    pub fn for_success(action: &str) -> Self {
        let tag = action.to_ascii_uppercase();
        SEVERITY_RULES
            .iter()
            .find(|(fragments, _)| fragments.iter().any(|f| tag.contains(f)))
            .map(|(_, severity)| *severity)
            .unwrap_or(Severity::Medium)
    }

    /// Failed privileged actions are always HIGH.
    pub fn for_failure() -> Self {
        Severity::High
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(AppError::validation(format!("Invalid severity: {}", s))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client metadata captured from the transport for audit purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub forwarded_for: Option<String>,
    pub proxy_client_ip: Option<String>,
    pub wl_proxy_client_ip: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl RequestContext {
    /// Resolve the client address: forwarded-for, proxy-client-ip,
    /// wl-proxy-client-ip, then the socket address. Empty and `unknown`
    /// values are skipped.
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|value| value.split(',').next());

        [
            forwarded,
            self.proxy_client_ip.as_deref(),
            self.wl_proxy_client_ip.as_deref(),
            self.remote_addr.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty() && !candidate.eq_ignore_ascii_case(UNKNOWN_ADDRESS))
        .map(str::to_string)
    }
}

/// Who did what to which resource, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub context: RequestContext,
}

impl AuditRecord {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            target_user_id: None,
            context: RequestContext::default(),
        }
    }

    pub fn resource(mut self, id: Option<i64>) -> Self {
        self.resource_id = id;
        self
    }

    pub fn target_user(mut self, id: Option<i64>) -> Self {
        self.target_user_id = id;
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// An entry ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub admin_username: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn success(record: AuditRecord, details: impl Into<String>) -> Self {
        let severity = Severity::for_success(&record.action);
        Self::build(record, true, Some(details.into()), None, severity)
    }

    pub fn failure(record: AuditRecord, error_message: impl Into<String>) -> Self {
        Self::build(
            record,
            false,
            None,
            Some(error_message.into()),
            Severity::for_failure(),
        )
    }

    fn build(
        record: AuditRecord,
        success: bool,
        details: Option<String>,
        error_message: Option<String>,
        severity: Severity,
    ) -> Self {
        let ip_address = record.context.client_ip();
        Self {
            admin_username: record.actor,
            action: record.action,
            resource_type: record.resource_type,
            resource_id: record.resource_id,
            target_user_id: record.target_user_id,
            details,
            ip_address,
            user_agent: record.context.user_agent,
            session_id: record.context.session_id,
            success,
            error_message,
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn into_entry(self, id: i64) -> AuditEntry {
        AuditEntry {
            id,
            admin_username: self.admin_username,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            target_user_id: self.target_user_id,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            session_id: self.session_id,
            success: self.success,
            error_message: self.error_message,
            severity: self.severity,
            timestamp: self.timestamp,
        }
    }
}

/// A stored, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuditEntry {
    pub id: i64,
    #[schema(example = "root")]
    pub admin_username: String,
    #[schema(example = "CREATE_USER")]
    pub action: String,
    #[schema(example = "USER")]
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Conjunctive filter over ledger entries. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub admin_username: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub severity: Option<Severity>,
    pub success: Option<bool>,
}

impl AuditFilter {
    pub fn by_admin(admin_username: impl Into<String>) -> Self {
        Self {
            admin_username: Some(admin_username.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.admin_username
            .as_ref()
            .map_or(true, |admin| &entry.admin_username == admin)
            && self.action.as_ref().map_or(true, |a| &entry.action == a)
            && self
                .resource_type
                .as_ref()
                .map_or(true, |r| &entry.resource_type == r)
            && self.severity.map_or(true, |s| entry.severity == s)
            && self.success.map_or(true, |s| entry.success == s)
    }
}

/// Number of entries recorded for one action tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActionCount {
    pub action: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rules_in_priority_order() {
        assert_eq!(Severity::for_success("DELETE_USER"), Severity::Critical);
        assert_eq!(Severity::for_success("PROCESS_REFUND"), Severity::Critical);
        assert_eq!(Severity::for_success("SYSTEM_SHUTDOWN"), Severity::Critical);
        assert_eq!(Severity::for_success("CREATE_USER"), Severity::High);
        assert_eq!(Severity::for_success("UPDATE_USER_STATUS"), Severity::High);
        assert_eq!(Severity::for_success("ORDER_STATUS_CHANGE"), Severity::High);
        assert_eq!(Severity::for_success("VIEW_USERS"), Severity::Low);
        assert_eq!(Severity::for_success("GET_REPORT"), Severity::Low);
        assert_eq!(Severity::for_success("VIEW_USER_ANALYTICS"), Severity::Low);
        assert_eq!(Severity::for_success("EXPORT_DATA"), Severity::Medium);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Both DELETE and VIEW appear; the CRITICAL rule is checked first.
        assert_eq!(Severity::for_success("VIEW_THEN_DELETE"), Severity::Critical);
        assert_eq!(Severity::for_success("CREATE_VIEW"), Severity::High);
    }

    #[test]
    fn test_failure_entries_are_high() {
        let record = AuditRecord::new("root", "VIEW_USERS", "USER");
        let entry = NewAuditEntry::failure(record, "boom");
        assert_eq!(entry.severity, Severity::High);
        assert!(!entry.success);
        assert_eq!(entry.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_client_ip_priority() {
        let ctx = RequestContext {
            forwarded_for: Some("unknown".to_string()),
            proxy_client_ip: Some("".to_string()),
            wl_proxy_client_ip: Some("10.0.0.7".to_string()),
            remote_addr: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.client_ip().as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_client_ip_takes_first_forwarded_hop() {
        let ctx = RequestContext {
            forwarded_for: Some(" 203.0.113.9 , 10.0.0.1".to_string()),
            remote_addr: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.client_ip().as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_falls_back_to_remote_addr() {
        let ctx = RequestContext {
            forwarded_for: Some("UNKNOWN".to_string()),
            remote_addr: Some("192.168.1.2".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.client_ip().as_deref(), Some("192.168.1.2"));
        assert_eq!(RequestContext::default().client_ip(), None);
    }

    #[test]
    fn test_success_entry_carries_context() {
        let ctx = RequestContext {
            remote_addr: Some("1.2.3.4".to_string()),
            user_agent: Some("curl/8".to_string()),
            session_id: Some("s-1".to_string()),
            ..Default::default()
        };
        let record = AuditRecord::new("root", "CREATE_USER", "USER")
            .resource(Some(5))
            .target_user(Some(5))
            .context(ctx);
        let entry = NewAuditEntry::success(record, "Created user: bob with role: STAFF");

        assert_eq!(entry.severity, Severity::High);
        assert_eq!(entry.ip_address.as_deref(), Some("1.2.3.4"));
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(entry.session_id.as_deref(), Some("s-1"));
        assert_eq!(entry.resource_id, Some(5));
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("severe".parse::<Severity>().is_err());
    }
}
