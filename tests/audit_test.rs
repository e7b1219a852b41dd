//! Action envelope and audit ledger over in-memory storage.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use admin_directory::config::{ACTION_CREATE_USER, ACTION_VIEW_USERS, RESOURCE_USER};
use admin_directory::domain::{AuditRecord, RequestContext, Severity};
use admin_directory::services::{
    ActionEnvelope, AdminAction, AuditLedger, AuditService, Summary, UserDirectory,
};

use common::{create_request, directory, MemoryAuditRepository};

fn ledger() -> (Arc<AuditService>, Arc<MemoryAuditRepository>) {
    let repository = Arc::new(MemoryAuditRepository::new());
    (Arc::new(AuditService::new(repository.clone())), repository)
}

fn create_action(actor: &str) -> AdminAction {
    AdminAction::new(
        actor,
        ACTION_CREATE_USER,
        RESOURCE_USER,
        RequestContext {
            forwarded_for: Some("198.51.100.4, 10.0.0.1".to_string()),
            user_agent: Some("integration-test".to_string()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_successful_create_writes_one_high_success_entry() {
    let (directory, _stores) = directory();
    let (ledger, repository) = ledger();
    let envelope = ActionEnvelope::new(ledger);

    let account = envelope
        .run(
            create_action("root"),
            directory.create_user(create_request("eve", "STAFF")),
            |account| {
                Summary::new(format!(
                    "Created user: {} with role: {}",
                    account.username,
                    account.role()
                ))
                .with_resource(account.id)
            },
        )
        .await
        .unwrap();

    let entries = repository.all();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(entry.success);
    assert_eq!(entry.severity, Severity::High);
    assert_eq!(entry.details.as_deref(), Some("Created user: eve with role: STAFF"));
    assert_eq!(entry.resource_id, Some(account.id));
    assert_eq!(entry.target_user_id, Some(account.id));
    assert_eq!(entry.ip_address.as_deref(), Some("198.51.100.4"));
    assert_eq!(entry.user_agent.as_deref(), Some("integration-test"));
    assert!(entry.error_message.is_none());
}

#[tokio::test]
async fn test_duplicate_create_writes_one_high_failure_entry() {
    let (directory, _stores) = directory();
    directory
        .create_user(create_request("eve", "STAFF"))
        .await
        .unwrap();
    let (ledger, repository) = ledger();
    let envelope = ActionEnvelope::new(ledger);

    let failure = envelope
        .run(
            create_action("root"),
            directory.create_user(create_request("eve", "STAFF")),
            |_| Summary::new("unreachable"),
        )
        .await
        .unwrap_err();

    assert!(failure.error().is_business_rule());
    assert_eq!(
        failure.client_message(),
        "Failed to create user: Username already exists: eve"
    );

    let entries = repository.all();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].success);
    assert_eq!(entries[0].severity, Severity::High);
    assert_eq!(
        entries[0].error_message.as_deref(),
        Some("Username already exists: eve")
    );
    assert!(entries[0].details.is_none());
}

#[tokio::test]
async fn test_failed_read_is_still_high() {
    let (directory, _stores) = directory();
    let (ledger, repository) = ledger();
    let envelope = ActionEnvelope::new(ledger);
    let action = AdminAction::new("root", ACTION_VIEW_USERS, RESOURCE_USER, RequestContext::default());

    envelope
        .run(action, directory.get_all_users(-1, 10, None), |_| {
            Summary::new("Viewed users page -1")
        })
        .await
        .unwrap_err();

    let entries = repository.all();
    assert_eq!(entries.len(), 1);
    // A successful VIEW would be LOW; failures are always HIGH.
    assert_eq!(entries[0].severity, Severity::High);
}

#[tokio::test]
async fn test_entries_by_admin_newest_first_and_only_that_admin() {
    let (ledger, _repository) = ledger();

    for (actor, action) in [
        ("alice", "VIEW_USERS"),
        ("bob", "DELETE_USER"),
        ("alice", "CREATE_USER"),
        ("alice", "UPDATE_USER"),
    ] {
        ledger
            .record_success(AuditRecord::new(actor, action, "USER"), "ok".to_string())
            .await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let page = ledger.entries_by_admin("alice", 0, 10).await.unwrap();

    assert_eq!(page.meta.total, 3);
    assert!(page.data.iter().all(|e| e.admin_username == "alice"));
    assert!(page
        .data
        .windows(2)
        .all(|pair| pair[0].timestamp > pair[1].timestamp));
    let actions: Vec<_> = page.data.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["UPDATE_USER", "CREATE_USER", "VIEW_USERS"]);
}

#[tokio::test]
async fn test_failed_actions_and_summary() {
    let (ledger, _repository) = ledger();
    let start = Utc::now();

    ledger
        .record_failure(AuditRecord::new("root", "DELETE_USER", "USER"), "nope".to_string())
        .await;
    ledger
        .record_success(AuditRecord::new("root", "VIEW_USERS", "USER"), "ok".to_string())
        .await;
    ledger
        .record_success(AuditRecord::new("root", "VIEW_USERS", "USER"), "ok".to_string())
        .await;

    let failures = ledger.failed_actions_since("root", start).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].action, "DELETE_USER");

    let summary = ledger.action_summary(start, Utc::now()).await.unwrap();
    assert_eq!(summary[0].action, "VIEW_USERS");
    assert_eq!(summary[0].count, 2);

    let count = ledger
        .count_by_admin_between("root", start, Utc::now())
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_queued_ledger_drains_on_shutdown() {
    let repository = Arc::new(MemoryAuditRepository::new());
    let (ledger, writer) = AuditService::queued(repository.clone(), 4);

    for i in 0..10 {
        ledger
            .record_success(
                AuditRecord::new("root", "VIEW_USER", "USER").resource(Some(i)),
                format!("Viewed user {}", i),
            )
            .await;
    }

    drop(ledger);
    writer.finished().await;

    assert_eq!(repository.all().len(), 10);
}
