//! Pairs every privileged call with exactly one audit ledger entry.

use std::future::Future;
use std::sync::Arc;

use crate::config::RESOURCE_USER;
use crate::domain::{AuditRecord, RequestContext};
use crate::errors::{ActionFailure, AppResult};
use crate::services::AuditLedger;

/// An administrative action about to be attempted.
#[derive(Debug, Clone)]
pub struct AdminAction {
    pub actor: String,
    pub action: &'static str,
    pub resource_type: &'static str,
    pub resource_id: Option<i64>,
    pub context: RequestContext,
}

impl AdminAction {
    pub fn new(
        actor: impl Into<String>,
        action: &'static str,
        resource_type: &'static str,
        context: RequestContext,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            resource_type,
            resource_id: None,
            context,
        }
    }

    /// Resource known before the call runs, e.g. a path id.
    pub fn on(mut self, resource_id: i64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    fn into_record(self, resource_id: Option<i64>) -> AuditRecord {
        let resource_id = resource_id.or(self.resource_id);
        // Only user resources name a target account.
        let target = (self.resource_type == RESOURCE_USER)
            .then_some(resource_id)
            .flatten();

        AuditRecord::new(self.actor, self.action, self.resource_type)
            .resource(resource_id)
            .target_user(target)
            .context(self.context)
    }
}

/// What a successful action did, for the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub details: String,
    pub resource_id: Option<i64>,
}

impl Summary {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            resource_id: None,
        }
    }

    /// Resource id only known once the call has run, e.g. a created account.
    pub fn with_resource(mut self, resource_id: i64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }
}

#[derive(Clone)]
pub struct ActionEnvelope {
    ledger: Arc<dyn AuditLedger>,
}

impl ActionEnvelope {
    pub fn new(ledger: Arc<dyn AuditLedger>) -> Self {
        Self { ledger }
    }

    /// Run `operation` and record its outcome once.
    ///
    /// The ledger call cannot change the result: recording is infallible and
    /// the operation's own error is returned wrapped in [`ActionFailure`].
    pub async fn run<T, F, D>(
        &self,
        action: AdminAction,
        operation: F,
        describe: D,
    ) -> Result<T, ActionFailure>
    where
        F: Future<Output = AppResult<T>>,
        D: FnOnce(&T) -> Summary,
    {
        let tag = action.action;

        match operation.await {
            Ok(value) => {
                let summary = describe(&value);
                self.ledger
                    .record_success(action.into_record(summary.resource_id), summary.details)
                    .await;
                Ok(value)
            }
            Err(err) => {
                self.ledger
                    .record_failure(action.into_record(None), err.audit_message())
                    .await;
                Err(ActionFailure::new(tag, err))
            }
        }
    }
}
