//! Audit ledger - best-effort record of administrative actions.
//!
//! Recording never fails from the caller's point of view: persistence errors
//! are logged and dropped. In queued mode entries go through an in-process
//! outbox so the audited call does not wait on ledger I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::domain::{ActionCount, AuditEntry, AuditFilter, AuditRecord, NewAuditEntry};
use crate::errors::{AppError, AppResult};
use crate::infra::AuditRepository;
use crate::types::{PageRequest, Paginated};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Audit ledger operations.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Record a successful action. Severity follows the action tag.
    async fn record_success(&self, record: AuditRecord, details: String);

    /// Record a failed action. Severity is always HIGH.
    async fn record_failure(&self, record: AuditRecord, error_message: String);

    /// All entries, newest first
    async fn entries(&self, page: i64, size: i64) -> AppResult<Paginated<AuditEntry>>;

    /// Entries by one admin, newest first
    async fn entries_by_admin(
        &self,
        admin_username: &str,
        page: i64,
        size: i64,
    ) -> AppResult<Paginated<AuditEntry>>;

    async fn search(
        &self,
        filter: AuditFilter,
        page: i64,
        size: i64,
    ) -> AppResult<Paginated<AuditEntry>>;

    async fn failed_actions_since(
        &self,
        admin_username: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEntry>>;

    async fn action_summary(
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

/// Default [`AuditLedger`] implementation.
pub struct AuditService {
    repository: Arc<dyn AuditRepository>,
    outbox: Option<mpsc::Sender<NewAuditEntry>>,
}

impl AuditService {
    /// Persist each entry within the recording call.
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self {
            repository,
            outbox: None,
        }
    }

    /// Hand entries to a background writer through a bounded queue.
    ///
    /// Must be called inside a Tokio runtime. The writer stops once every
    /// clone of the returned service has been dropped and the queue drained.
    pub fn queued(repository: Arc<dyn AuditRepository>, capacity: usize) -> (Self, AuditWriter) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let writer = AuditWriter::spawn(repository.clone(), receiver);

        (
            Self {
                repository,
                outbox: Some(sender),
            },
            writer,
        )
    }

    async fn append(&self, entry: NewAuditEntry) {
        log_action(&entry);

        let Some(outbox) = &self.outbox else {
            return persist(self.repository.as_ref(), entry).await;
        };

        match outbox.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) | Err(TrySendError::Closed(entry)) => {
                tracing::warn!(action = %entry.action, "Audit queue unavailable, writing inline");
                persist(self.repository.as_ref(), entry).await;
            }
        }
    }
}

/// Operational log line mirroring every ledger entry.
fn log_action(entry: &NewAuditEntry) {
    if entry.success {
        tracing::info!(
            admin = %entry.admin_username,
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = ?entry.resource_id,
            severity = %entry.severity,
            details = entry.details.as_deref().unwrap_or_default(),
            "ADMIN_ACTION"
        );
    } else {
        tracing::warn!(
            admin = %entry.admin_username,
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = ?entry.resource_id,
            error = entry.error_message.as_deref().unwrap_or_default(),
            "ADMIN_ACTION_FAILED"
        );
    }
}

async fn persist(repository: &dyn AuditRepository, entry: NewAuditEntry) {
    let action = entry.action.clone();
    let admin = entry.admin_username.clone();

    if let Err(e) = repository.insert(entry).await {
        tracing::error!(admin = %admin, action = %action, error = ?e, "Failed to persist audit entry");
    }
}

#[async_trait]
impl AuditLedger for AuditService {
    async fn record_success(&self, record: AuditRecord, details: String) {
        self.append(NewAuditEntry::success(record, details)).await;
    }

    async fn record_failure(&self, record: AuditRecord, error_message: String) {
        self.append(NewAuditEntry::failure(record, error_message)).await;
    }

    async fn entries(&self, page: i64, size: i64) -> AppResult<Paginated<AuditEntry>> {
        self.search(AuditFilter::default(), page, size).await
    }

    async fn entries_by_admin(
        &self,
        admin_username: &str,
        page: i64,
        size: i64,
    ) -> AppResult<Paginated<AuditEntry>> {
        self.search(AuditFilter::by_admin(admin_username), page, size)
            .await
    }

    async fn search(
        &self,
        filter: AuditFilter,
        page: i64,
        size: i64,
    ) -> AppResult<Paginated<AuditEntry>> {
        let request = PageRequest::new(page, size)?;
        let (entries, total) = self
            .repository
            .search(filter, request.page, request.size)
            .await?;

        Ok(Paginated::new(entries, request, total))
    }

    async fn failed_actions_since(
        &self,
        admin_username: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<AuditEntry>> {
        self.repository.failed_since(admin_username, since).await
    }

    async fn action_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<ActionCount>> {
        ensure_window(from, to)?;
        self.repository.action_counts(from, to).await
    }

    async fn count_by_admin_between(
        &self,
        admin_username: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64> {
        ensure_window(from, to)?;
        self.repository
            .count_by_admin_between(admin_username, from, to)
            .await
    }
}

fn ensure_window(from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<()> {
    if from > to {
        return Err(AppError::validation(
            "Start of time window must not be after its end",
        ));
    }
    Ok(())
}

/// Background task draining the queued audit outbox.
pub struct AuditWriter {
    handle: JoinHandle<()>,
}

impl AuditWriter {
    fn spawn(repository: Arc<dyn AuditRepository>, mut receiver: mpsc::Receiver<NewAuditEntry>) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                persist(repository.as_ref(), entry).await;
            }
            tracing::info!("Audit writer drained");
        });

        Self { handle }
    }

    /// Wait until the outbox is closed and every queued entry is written.
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Audit writer task failed");
        }
    }
}
