use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{Header, RequestContext, WorkflowParameter};
use crate::repositories::DocumentStore;
use crate::services::erp::{populate_stock_names, StockNamed};
use crate::services::reconciliation::{LineCheck, LineTotals, QuantityPolicy};
use crate::services::snapshot::HeaderSnapshot;
use crate::services::WorkflowBackend;

/// Collection progress of one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProgress {
    pub line_id: i64,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub stock_name: Option<String>,
    pub ordered: Decimal,
    pub collected: Decimal,
    pub remaining: Decimal,
}

impl From<LineTotals> for LineProgress {
    fn from(totals: LineTotals) -> Self {
        let remaining = totals.remaining();
        Self {
            line_id: totals.line_id,
            stock_code: totals.stock_code,
            configuration_code: totals.configuration_code,
            stock_name: None,
            ordered: totals.ordered,
            collected: totals.collected,
            remaining,
        }
    }
}

impl StockNamed for LineProgress {
    fn stock_code(&self) -> &str {
        &self.stock_code
    }

    fn set_stock_name(&mut self, name: Option<String>) {
        self.stock_name = name;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub header_id: i64,
    pub is_completed: bool,
    pub lines: Vec<LineProgress>,
    /// Collected under import lines that are not linked to a line.
    pub unlinked_collected: Decimal,
}

#[derive(Clone)]
pub struct CompletionService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> CompletionService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    /// Reconciles collected against ordered quantities and marks the header completed.
    ///
    /// The first failing line aborts the completion and leaves the header unchanged.
    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn complete(&self, header_id: i64, ctx: &RequestContext) -> Result<Header, ServiceError> {
        let workflow = self.backend.store.workflow();
        let guard = self.backend.locks.acquire(workflow, header_id).await;

        let result = match self.backend.db.begin().await {
            Ok(txn) => {
                let outcome = self.reconcile(&txn, header_id).await;
                finish(txn, outcome).await
            }
            Err(e) => Err(e.into()),
        };
        drop(guard);
        self.backend.locks.release(workflow, header_id);

        let header = result.map_err(|e| {
            warn!(error = %e, "Completion rejected");
            e
        })?;

        info!(
            pending_approval = header.is_pending_approval,
            "Order completed"
        );
        self.backend
            .event_sender
            .publish(Event::OrderCompleted {
                workflow,
                header_id,
                pending_approval: header.is_pending_approval,
            })
            .await;

        Ok(header)
    }

    async fn reconcile(&self, txn: &DatabaseTransaction, header_id: i64) -> Result<Header, ServiceError> {
        let store = &self.backend.store;
        let header = store
            .find_active_header(txn, header_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Header", header_id))?;
        if header.is_completed {
            return Err(ServiceError::InvalidOperation(format!(
                "Header {} is already completed",
                header_id
            )));
        }

        let policy = QuantityPolicy::from_parameter(store.workflow_parameter(txn).await?.as_ref());
        let snapshot = HeaderSnapshot::load(store, txn, header).await?;

        for totals in snapshot.all_line_totals() {
            match policy.check_line(&totals)? {
                LineCheck::Passed => {}
                LineCheck::Skipped => {
                    debug!(line_id = totals.line_id, "Uncollected line skipped")
                }
            }
        }

        Ok(store
            .mark_completed(txn, header_id, Utc::now(), policy.require_approval)
            .await?)
    }

    /// The quantity policy currently configured for the workflow.
    #[instrument(skip(self), fields(workflow = %self.backend.store.workflow()))]
    pub async fn policy(&self) -> Result<QuantityPolicy, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self
            .backend
            .store
            .workflow_parameter(&txn)
            .await
            .map_err(ServiceError::from);
        let parameter = finish(txn, outcome).await?;
        Ok(QuantityPolicy::from_parameter(parameter.as_ref()))
    }

    #[instrument(skip(self), fields(workflow = %self.backend.store.workflow()))]
    pub async fn set_policy(&self, policy: QuantityPolicy) -> Result<QuantityPolicy, ServiceError> {
        let parameter = WorkflowParameter {
            id: 0,
            allow_less_quantity_based_on_order: policy.allow_less,
            allow_more_quantity_based_on_order: policy.allow_more,
            require_all_order_items_collected: policy.require_all_collected,
            require_approval_before_erp: policy.require_approval,
        };
        let txn = self.backend.db.begin().await?;
        let outcome = self
            .backend
            .store
            .save_parameter(&txn, parameter)
            .await
            .map_err(ServiceError::from);
        let saved = finish(txn, outcome).await?;

        info!(?policy, "Quantity policy saved");
        Ok(QuantityPolicy::from_parameter(Some(&saved)))
    }

    /// Ordered, collected and remaining quantity per line, with ERP stock names.
    #[instrument(skip(self), fields(workflow = %self.backend.store.workflow()))]
    pub async fn collection_summary(&self, header_id: i64) -> Result<CollectionSummary, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self.summarize(&txn, header_id).await;
        let mut summary = finish(txn, outcome).await?;

        populate_stock_names(self.backend.erp.as_ref(), &mut summary.lines).await?;
        Ok(summary)
    }

    async fn summarize(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
    ) -> Result<CollectionSummary, ServiceError> {
        let store = &self.backend.store;
        let header = store
            .find_active_header(txn, header_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Header", header_id))?;
        let snapshot = HeaderSnapshot::load(store, txn, header).await?;

        Ok(CollectionSummary {
            header_id,
            is_completed: snapshot.header.is_completed,
            unlinked_collected: snapshot.unlinked_collected(),
            lines: snapshot
                .all_line_totals()
                .into_iter()
                .map(LineProgress::from)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn progress_carries_remaining_quantity() {
        let progress = LineProgress::from(LineTotals {
            line_id: 3,
            stock_code: "A1".into(),
            configuration_code: None,
            ordered: dec!(10),
            collected: dec!(4),
        });
        assert_eq!(progress.remaining, dec!(6));
        assert_eq!(progress.stock_name, None);
    }
}
