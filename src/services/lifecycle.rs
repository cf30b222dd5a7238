//! Soft-delete of leaf records with upward cascade.
//!
//! Rows are tombstoned, never removed, so every cascade step re-counts the non-deleted children of
//! the parent inside the same transaction. The decisions themselves are the pure predicates below.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{ImportLine, LineSerial, RequestContext, Route, SerialSlots};
use crate::repositories::DocumentStore;
use crate::services::reconciliation::QUANTITY_EPSILON;
use crate::services::WorkflowBackend;

/// What a delete request removed, leaf first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    pub header_id: i64,
    pub deleted_route_id: Option<i64>,
    pub deleted_line_serial_id: Option<i64>,
    pub deleted_import_line_id: Option<i64>,
    pub deleted_line_id: Option<i64>,
    pub header_deleted: bool,
}

/// An import line goes once it has no routes, unless its line still orders something.
pub fn import_line_removable(active_routes: u64, linked_line_has_active_serials: bool) -> bool {
    active_routes == 0 && !linked_line_has_active_serials
}

pub fn line_is_empty(active_line_serials: u64, active_import_lines: u64) -> bool {
    active_line_serials == 0 && active_import_lines == 0
}

pub fn header_is_empty(active_lines: u64, active_import_lines: u64) -> bool {
    active_lines == 0 && active_import_lines == 0
}

/// True when any route already collected one of the line serial's serial numbers.
pub fn serials_in_use(line_serial: &LineSerial, routes: &[Route]) -> bool {
    line_serial.has_serial() && routes.iter().any(|r| r.shares_serial_with(line_serial))
}

/// The line's ordered total without `removed` must still cover what was collected.
pub fn remaining_covers_collected(total: Decimal, removed: Decimal, collected: Decimal) -> bool {
    total - removed - collected >= -QUANTITY_EPSILON
}

#[derive(Debug, Clone, Copy)]
enum Leaf {
    Route(i64),
    LineSerial(i64),
    ImportLine(i64),
}

#[derive(Clone)]
pub struct LifecycleService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> LifecycleService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn delete_route(
        &self,
        route_id: i64,
        ctx: &RequestContext,
    ) -> Result<CascadeOutcome, ServiceError> {
        let result = self.remove(Leaf::Route(route_id), ctx).await;
        self.conclude(result).await
    }

    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn delete_line_serial(
        &self,
        line_serial_id: i64,
        ctx: &RequestContext,
    ) -> Result<CascadeOutcome, ServiceError> {
        let result = self.remove(Leaf::LineSerial(line_serial_id), ctx).await;
        self.conclude(result).await
    }

    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn delete_import_line(
        &self,
        import_line_id: i64,
        ctx: &RequestContext,
    ) -> Result<CascadeOutcome, ServiceError> {
        let result = self.remove(Leaf::ImportLine(import_line_id), ctx).await;
        self.conclude(result).await
    }

    /// Runs one delete under the lock of the record's header, so it cannot interleave with a scan.
    async fn remove(&self, leaf: Leaf, ctx: &RequestContext) -> Result<CascadeOutcome, ServiceError> {
        let workflow = self.backend.store.workflow();
        let header_id = self.owning_header(leaf).await?;
        let guard = self.backend.locks.acquire(workflow, header_id).await;

        let at = Utc::now();
        let result = match self.backend.db.begin().await {
            Ok(txn) => {
                let outcome = match leaf {
                    Leaf::Route(id) => self.remove_route(&txn, id, ctx.user_id, at).await,
                    Leaf::LineSerial(id) => self.remove_line_serial(&txn, id, ctx.user_id, at).await,
                    Leaf::ImportLine(id) => self.remove_import_line(&txn, id, ctx.user_id, at).await,
                };
                finish(txn, outcome).await
            }
            Err(e) => Err(e.into()),
        };
        drop(guard);
        self.backend.locks.release(workflow, header_id);
        result
    }

    async fn owning_header(&self, leaf: Leaf) -> Result<i64, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self.find_owning_header(&txn, leaf).await;
        finish(txn, outcome).await
    }

    async fn find_owning_header(
        &self,
        txn: &DatabaseTransaction,
        leaf: Leaf,
    ) -> Result<i64, ServiceError> {
        let store = &self.backend.store;
        match leaf {
            Leaf::Route(id) => {
                let route = store
                    .find_active_route(txn, id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Route", id))?;
                self.import_line_header(txn, route.import_line_id).await
            }
            Leaf::LineSerial(id) => {
                let line_serial = store
                    .find_active_line_serial(txn, id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Line serial", id))?;
                store
                    .find_active_line(txn, line_serial.line_id)
                    .await?
                    .map(|l| l.header_id)
                    .ok_or_else(|| ServiceError::not_found("Line", line_serial.line_id))
            }
            Leaf::ImportLine(id) => self.import_line_header(txn, id).await,
        }
    }

    async fn import_line_header(
        &self,
        txn: &DatabaseTransaction,
        import_line_id: i64,
    ) -> Result<i64, ServiceError> {
        self.backend
            .store
            .find_active_import_line(txn, import_line_id)
            .await?
            .map(|il| il.header_id)
            .ok_or_else(|| ServiceError::not_found("Import line", import_line_id))
    }

    async fn conclude(
        &self,
        result: Result<CascadeOutcome, ServiceError>,
    ) -> Result<CascadeOutcome, ServiceError> {
        let outcome = result.map_err(|e| {
            warn!(error = %e, "Delete rejected");
            e
        })?;

        info!(
            header_id = outcome.header_id,
            import_line = ?outcome.deleted_import_line_id,
            line = ?outcome.deleted_line_id,
            header_deleted = outcome.header_deleted,
            "Records removed"
        );
        self.backend
            .event_sender
            .publish(Event::RecordsRemoved {
                workflow: self.backend.store.workflow(),
                outcome: outcome.clone(),
            })
            .await;
        Ok(outcome)
    }

    async fn remove_route(
        &self,
        txn: &DatabaseTransaction,
        route_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<CascadeOutcome, ServiceError> {
        let store = &self.backend.store;
        let route = store
            .find_active_route(txn, route_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route", route_id))?;
        let import_line = store
            .find_active_import_line(txn, route.import_line_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Import line", route.import_line_id))?;

        store.soft_delete_route(txn, route.id, user_id, at).await?;
        let mut outcome = CascadeOutcome {
            header_id: import_line.header_id,
            deleted_route_id: Some(route.id),
            ..Default::default()
        };

        let remaining_routes = store.count_active_routes(txn, import_line.id).await?;
        let guarded = self.linked_line_has_serials(txn, &import_line).await?;
        if import_line_removable(remaining_routes, guarded) {
            store
                .soft_delete_import_line(txn, import_line.id, user_id, at)
                .await?;
            outcome.deleted_import_line_id = Some(import_line.id);
            outcome.header_deleted = self
                .cascade_header(txn, import_line.header_id, user_id, at)
                .await?;
        }
        Ok(outcome)
    }

    async fn remove_line_serial(
        &self,
        txn: &DatabaseTransaction,
        line_serial_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<CascadeOutcome, ServiceError> {
        let store = &self.backend.store;
        let line_serial = store
            .find_active_line_serial(txn, line_serial_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Line serial", line_serial_id))?;
        let line = store
            .find_active_line(txn, line_serial.line_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Line", line_serial.line_id))?;

        let linked: Vec<i64> = store
            .active_import_lines(txn, line.header_id)
            .await?
            .into_iter()
            .filter(|il| il.line_id == Some(line.id))
            .map(|il| il.id)
            .collect();
        let routes = store.active_routes(txn, &linked).await?;

        if serials_in_use(&line_serial, &routes) {
            return Err(ServiceError::InvalidOperation(format!(
                "Routes exist for serial {} of line {}",
                line_serial.serials().join(", "),
                line.id
            )));
        }

        let total: Decimal = store
            .active_line_serials(txn, &[line.id])
            .await?
            .iter()
            .map(|ls| ls.quantity)
            .sum();
        let collected: Decimal = routes.iter().map(|r| r.quantity).sum();
        if !remaining_covers_collected(total, line_serial.quantity, collected) {
            return Err(ServiceError::InvalidOperation(format!(
                "Insufficient quantity after delete: line {} would order {} but {} is collected",
                line.id,
                (total - line_serial.quantity).normalize(),
                collected.normalize()
            )));
        }

        store
            .soft_delete_line_serial(txn, line_serial.id, user_id, at)
            .await?;
        let mut outcome = CascadeOutcome {
            header_id: line.header_id,
            deleted_line_serial_id: Some(line_serial.id),
            ..Default::default()
        };

        let serials_left = store.count_active_line_serials(txn, line.id).await?;
        let import_lines_left = store.count_active_import_lines_for_line(txn, line.id).await?;
        if line_is_empty(serials_left, import_lines_left) {
            store.soft_delete_line(txn, line.id, user_id, at).await?;
            outcome.deleted_line_id = Some(line.id);
            outcome.header_deleted = self
                .cascade_header(txn, line.header_id, user_id, at)
                .await?;
        }
        Ok(outcome)
    }

    async fn remove_import_line(
        &self,
        txn: &DatabaseTransaction,
        import_line_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<CascadeOutcome, ServiceError> {
        let store = &self.backend.store;
        let import_line = store
            .find_active_import_line(txn, import_line_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Import line", import_line_id))?;

        let routes = store.count_active_routes(txn, import_line.id).await?;
        if routes > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Import line {} still has {} route(s)",
                import_line.id, routes
            )));
        }
        if self.linked_line_has_serials(txn, &import_line).await? {
            return Err(ServiceError::InvalidOperation(format!(
                "Line {} of import line {} still has line serials",
                import_line.line_id.unwrap_or_default(),
                import_line.id
            )));
        }

        store
            .soft_delete_import_line(txn, import_line.id, user_id, at)
            .await?;
        let header_deleted = self
            .cascade_header(txn, import_line.header_id, user_id, at)
            .await?;

        Ok(CascadeOutcome {
            header_id: import_line.header_id,
            deleted_import_line_id: Some(import_line.id),
            header_deleted,
            ..Default::default()
        })
    }

    /// A deleted linked line does not guard its import lines.
    async fn linked_line_has_serials(
        &self,
        txn: &DatabaseTransaction,
        import_line: &ImportLine,
    ) -> Result<bool, ServiceError> {
        let store = &self.backend.store;
        let Some(line_id) = import_line.line_id else {
            return Ok(false);
        };
        if store.find_active_line(txn, line_id).await?.is_none() {
            return Ok(false);
        }
        Ok(store.count_active_line_serials(txn, line_id).await? > 0)
    }

    async fn cascade_header(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let store = &self.backend.store;
        let lines = store.count_active_lines(txn, header_id).await?;
        let import_lines = store.count_active_import_lines(txn, header_id).await?;
        if !header_is_empty(lines, import_lines) {
            return Ok(false);
        }
        store.soft_delete_header(txn, header_id, user_id, at).await?;
        Ok(true)
    }
}
