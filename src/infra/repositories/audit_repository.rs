//! Append-only audit log persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use super::entities::audit_log::{ActiveModel, Column, Entity as AuditLogEntity};
use crate::domain::{ActionCount, AuditEntry, AuditFilter, NewAuditEntry};
use crate::errors::AppResult;
use crate::types::page_out_of_range;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Audit log repository. Entries are never updated or deleted here.
///
/// Every listing is newest first, with the id as a tie-break so the order is
/// strict even when timestamps collide.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, entry: NewAuditEntry) -> AppResult<AuditEntry>;

    /// One page of entries matching `filter` plus the total match count
    async fn search(
        &self,
        filter: AuditFilter,
        page: u64,
        size: u64,
    ) -> AppResult<(Vec<AuditEntry>, u64)>;

    /// Failed actions by one admin at or after `since`
    async fn failed_since(
        &self,
        admin_username: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEntry>>;

    /// Entry count per action tag in `[from, to]`, most frequent first
    async fn action_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<ActionCount>>;

    async fn count_by_admin_between(
        &self,
        admin_username: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// SeaORM-backed audit repository
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filtered(filter: AuditFilter) -> Select<AuditLogEntity> {
        let mut query = AuditLogEntity::find();

        if let Some(admin) = filter.admin_username {
            query = query.filter(Column::AdminUsername.eq(admin));
        }
        if let Some(action) = filter.action {
            query = query.filter(Column::Action.eq(action));
        }
        if let Some(resource_type) = filter.resource_type {
            query = query.filter(Column::ResourceType.eq(resource_type));
        }
        if let Some(severity) = filter.severity {
            query = query.filter(Column::Severity.eq(severity.as_str()));
        }
        if let Some(success) = filter.success {
            query = query.filter(Column::Success.eq(success));
        }

        query
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
    }
}

#[async_trait]
impl AuditRepository for AuditStore {
    async fn insert(&self, entry: NewAuditEntry) -> AppResult<AuditEntry> {
        let active: ActiveModel = entry.into();
        let model = active.insert(&self.db).await?;
        Ok(model.into())
    }

    async fn search(
        &self,
        filter: AuditFilter,
        page: u64,
        size: u64,
    ) -> AppResult<(Vec<AuditEntry>, u64)> {
        // fetch_page multiplies without checking
        if page.checked_mul(size).is_none() {
            return Err(page_out_of_range());
        }

        let paginator = Self::filtered(filter).paginate(&self.db, size);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models.into_iter().map(AuditEntry::from).collect(), total))
    }

    async fn failed_since(
        &self,
        admin_username: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEntry>> {
        let models = AuditLogEntity::find()
            .filter(Column::AdminUsername.eq(admin_username))
            .filter(Column::Success.eq(false))
            .filter(Column::Timestamp.gte(since))
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(AuditEntry::from).collect())
    }

    async fn action_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<ActionCount>> {
        let rows: Vec<(String, i64)> = AuditLogEntity::find()
            .select_only()
            .column(Column::Action)
            .column_as(Expr::col(Column::Id).count(), "count")
            .filter(Column::Timestamp.between(from, to))
            .group_by(Column::Action)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(most_frequent_first(rows))
    }

    async fn count_by_admin_between(
        &self,
        admin_username: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count = AuditLogEntity::find()
            .filter(Column::AdminUsername.eq(admin_username))
            .filter(Column::Timestamp.between(from, to))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}

/// Highest count first; ties in action-name order.
fn most_frequent_first(rows: Vec<(String, i64)>) -> Vec<ActionCount> {
    let mut counts: Vec<ActionCount> = rows
        .into_iter()
        .map(|(action, count)| ActionCount {
            action,
            count: count.max(0) as u64,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action.cmp(&b.action)));
    counts
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait, Value};

    use super::*;
    use crate::domain::Severity;
    use crate::infra::repositories::entities::audit_log::Model;

    fn sql(filter: AuditFilter) -> String {
        AuditStore::filtered(filter)
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    fn row(id: i64, action: &str) -> Model {
        Model {
            id,
            admin_username: "root".to_string(),
            action: action.to_string(),
            resource_type: "USER".to_string(),
            resource_id: Some(id),
            target_user_id: Some(id),
            details: None,
            ip_address: None,
            user_agent: None,
            session_id: None,
            success: true,
            error_message: None,
            severity: "LOW".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_filter_ands_present_fields_only() {
        let query = sql(AuditFilter {
            admin_username: Some("root".to_string()),
            severity: Some(Severity::High),
            success: Some(false),
            ..Default::default()
        });

        assert!(query.contains(r#""audit_logs"."admin_username" = 'root' AND"#));
        assert!(query.contains(r#""audit_logs"."severity" = 'HIGH' AND"#));
        assert!(query.contains(r#""audit_logs"."success" = "#));
        assert!(!query.contains(r#""audit_logs"."action" = "#));
        assert!(!query.contains(r#""audit_logs"."resource_type" = "#));
    }

    #[test]
    fn test_listing_is_newest_first_with_id_tie_break() {
        let query = sql(AuditFilter::default());

        assert!(!query.contains("WHERE"));
        assert!(query.ends_with(
            r#"ORDER BY "audit_logs"."timestamp" DESC, "audit_logs"."id" DESC"#
        ));
    }

    #[test]
    fn test_action_counts_highest_first_ties_by_name() {
        let counts = most_frequent_first(vec![
            ("DELETE_USER".to_string(), 1),
            ("VIEW_USERS".to_string(), 4),
            ("CREATE_USER".to_string(), 1),
        ]);

        let ordered: Vec<_> = counts
            .iter()
            .map(|c| (c.action.as_str(), c.count))
            .collect();
        assert_eq!(
            ordered,
            vec![("VIEW_USERS", 4), ("CREATE_USER", 1), ("DELETE_USER", 1)]
        );
    }

    #[tokio::test]
    async fn test_search_reads_total_then_page() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[BTreeMap::from([("num_items", Value::BigInt(Some(12)))])]])
            .append_query_results([vec![row(12, "VIEW_USERS"), row(11, "CREATE_USER")]])
            .into_connection();
        let store = AuditStore::new(db);

        let (entries, total) = store.search(AuditFilter::default(), 0, 2).await.unwrap();

        assert_eq!(total, 12);
        let ids: Vec<_> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![12, 11]);
        assert_eq!(entries[0].severity, Severity::Low);
        assert_eq!(store.db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn test_search_rejects_overflowing_page_before_querying() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = AuditStore::new(db);

        let err = store
            .search(AuditFilter::default(), i64::MAX as u64, 10)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.db.into_transaction_log().is_empty());
    }
}
