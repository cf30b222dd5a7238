use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use tracing::{info, instrument, warn};

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{ApprovalState, Header, RequestContext};
use crate::repositories::DocumentStore;
use crate::services::WorkflowBackend;

#[derive(Clone)]
pub struct ApprovalService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> ApprovalService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    /// Approves or rejects a completed header waiting for approval. A decision is taken once.
    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn approve(
        &self,
        header_id: i64,
        approved: bool,
        ctx: &RequestContext,
    ) -> Result<Header, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self.decide(&txn, header_id, approved, ctx.user_id).await;
        let header = finish(txn, outcome).await.map_err(|e| {
            warn!(error = %e, "Approval rejected");
            e
        })?;

        info!(approved, "Approval recorded");
        self.backend
            .event_sender
            .publish(Event::ApprovalDecided {
                workflow: self.backend.store.workflow(),
                header_id,
                approved,
                user_id: ctx.user_id,
            })
            .await;
        Ok(header)
    }

    async fn decide(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
        approved: bool,
        user_id: i64,
    ) -> Result<Header, ServiceError> {
        let store = &self.backend.store;
        let header = store
            .find_active_header(txn, header_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Header", header_id))?;

        let state = ApprovalState::of(&header);
        if !state.can_decide() {
            return Err(ServiceError::InvalidOperation(format!(
                "Header {} is {} and cannot be approved or rejected",
                header_id, state
            )));
        }

        Ok(store
            .record_approval(txn, header_id, approved, user_id, Utc::now())
            .await?)
    }

    /// Completed headers of the caller's branch still waiting for a decision.
    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), branch = %ctx.branch_code))]
    pub async fn pending_approvals(&self, ctx: &RequestContext) -> Result<Vec<Header>, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self
            .backend
            .store
            .headers_pending_approval(&txn, &ctx.branch_code)
            .await
            .map_err(ServiceError::from);
        finish(txn, outcome).await
    }
}
