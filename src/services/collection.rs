use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{ids, ImportLine, NewImportLine, NewRoute, RequestContext, Route, SerialSlots};
use crate::repositories::DocumentStore;
use crate::services::erp::{populate_stock_names, StockNamed};
use crate::services::reconciliation::{QuantityPolicy, ScanTotals};
use crate::services::snapshot::{clean_configuration, HeaderSnapshot};
use crate::services::WorkflowBackend;

/// One barcode scan posted against a header.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ScanRequest {
    pub header_id: i64,
    #[validate(length(min = 1, max = 75))]
    pub scanned_barcode: String,
    #[validate(length(min = 1, max = 50))]
    pub stock_code: String,
    #[validate(length(max = 50))]
    pub configuration_code: Option<String>,
    pub quantity: Decimal,
    #[validate(length(max = 50))]
    pub serial_no: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no2: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no3: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no4: Option<String>,
    #[validate(length(max = 35))]
    pub source_cell_code: Option<String>,
    #[validate(length(max = 35))]
    pub target_cell_code: Option<String>,
    /// Defaults to the header's warehouse.
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub description: Option<String>,
}

impl SerialSlots for ScanRequest {
    fn serial_slots(&self) -> [Option<&str>; 4] {
        [
            self.serial_no.as_deref(),
            self.serial_no2.as_deref(),
            self.serial_no3.as_deref(),
            self.serial_no4.as_deref(),
        ]
    }
}

/// The import line a scan was recorded under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLineView {
    #[serde(flatten)]
    pub import_line: ImportLine,
    pub stock_name: Option<String>,
    /// Routes under this import line, including the new one.
    pub collected_quantity: Decimal,
}

impl StockNamed for ImportLineView {
    fn stock_code(&self) -> &str {
        &self.import_line.stock_code
    }

    fn set_stock_name(&mut self, name: Option<String>) {
        self.stock_name = name;
    }
}

/// Picks the candidate line with the largest remaining quantity; ties go to the earliest.
pub fn select_best_fit(candidates: &[(i64, Decimal)]) -> Option<i64> {
    candidates
        .iter()
        .fold(None::<(i64, Decimal)>, |best, &(id, remaining)| match best {
            Some((_, top)) if top >= remaining => best,
            _ => Some((id, remaining)),
        })
        .map(|(id, _)| id)
}

#[derive(Clone)]
pub struct BarcodeCollectionService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> BarcodeCollectionService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    /// Matches a scan to an order line and records it as a route.
    ///
    /// The whole resolution runs in one transaction; any rejection leaves neither an import line
    /// nor a route behind. Replaying a scan records it again unless the duplicate-serial guard of
    /// the workflow applies.
    #[instrument(
        skip(self, request, ctx),
        fields(
            workflow = %self.backend.store.workflow(),
            header_id = request.header_id,
            stock_code = %request.stock_code,
            quantity = %request.quantity
        )
    )]
    pub async fn scan(
        &self,
        request: ScanRequest,
        ctx: &RequestContext,
    ) -> Result<ImportLineView, ServiceError> {
        if request.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Scanned quantity must be greater than zero".to_string(),
            ));
        }
        request.validate()?;

        let workflow = self.backend.store.workflow();
        let guard = self.backend.locks.acquire(workflow, request.header_id).await;

        let result = match self.backend.db.begin().await {
            Ok(txn) => {
                let outcome = self.record(&txn, &request, ctx).await;
                finish(txn, outcome).await
            }
            Err(e) => Err(e.into()),
        };
        drop(guard);
        self.backend.locks.release(workflow, request.header_id);

        let (view, route) = result.map_err(|e| {
            warn!(error = %e, "Scan rejected");
            e
        })?;

        info!(
            import_line_id = view.import_line.id,
            route_id = route.id,
            "Scan recorded"
        );
        self.backend
            .event_sender
            .publish(Event::CollectionRecorded {
                workflow,
                header_id: request.header_id,
                import_line_id: view.import_line.id,
                route_id: route.id,
                quantity: route.quantity,
            })
            .await;

        Ok(view)
    }

    async fn record(
        &self,
        txn: &DatabaseTransaction,
        request: &ScanRequest,
        ctx: &RequestContext,
    ) -> Result<(ImportLineView, Route), ServiceError> {
        let store = &self.backend.store;
        let header = store
            .find_active_header(txn, request.header_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Header", request.header_id))?;
        if header.is_completed {
            return Err(ServiceError::InvalidOperation(format!(
                "Header {} is already completed and accepts no more scans",
                header.id
            )));
        }

        let policy = QuantityPolicy::from_parameter(store.workflow_parameter(txn).await?.as_ref());
        let snapshot = HeaderSnapshot::load(store, txn, header).await?;

        let stock_code = request.stock_code.trim();
        let configuration = clean_configuration(request.configuration_code.as_deref());
        let configuration_code = configuration.as_deref();

        let matching = snapshot.matching_lines(stock_code, configuration_code);
        if matching.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No order line on header {} matches stock '{}' configuration '{}'",
                snapshot.header.id,
                stock_code,
                configuration_code.unwrap_or("")
            )));
        }
        let line_ids = ids(matching.iter().copied());
        let collecting = snapshot.import_lines_collecting(&line_ids, stock_code, configuration_code);

        let serial = request
            .serials()
            .first()
            .map(|s| s.to_string())
            .filter(|_| snapshot.serial_tracked(&line_ids));

        let (candidates, totals) = match &serial {
            Some(serial) => {
                let pinned = snapshot.line_serials_with(&line_ids, serial);
                if pinned.is_empty() {
                    return Err(ServiceError::NotFound(format!(
                        "Serial '{}' is not ordered on header {} for stock '{}'",
                        serial, snapshot.header.id, stock_code
                    )));
                }
                let mut pinned_lines: Vec<i64> = Vec::new();
                for ls in &pinned {
                    if !pinned_lines.contains(&ls.line_id) {
                        pinned_lines.push(ls.line_id);
                    }
                }
                let totals = ScanTotals {
                    line_ids: pinned_lines.clone(),
                    stock_code: stock_code.to_string(),
                    configuration_code: configuration.clone(),
                    serial: Some(serial.clone()),
                    ordered: pinned.iter().map(|ls| ls.quantity).sum(),
                    collected: snapshot.collected_for_serial(&collecting, serial),
                    scanned: request.quantity,
                };
                (pinned_lines, totals)
            }
            None => {
                let totals = ScanTotals {
                    line_ids: line_ids.clone(),
                    stock_code: stock_code.to_string(),
                    configuration_code: configuration.clone(),
                    serial: None,
                    ordered: line_ids.iter().map(|id| snapshot.ordered_for_line(*id)).sum(),
                    collected: collecting
                        .iter()
                        .flat_map(|il| snapshot.routes_of(il.id))
                        .map(|r| r.quantity)
                        .sum(),
                    scanned: request.quantity,
                };
                (line_ids.clone(), totals)
            }
        };

        // A replayed serial is a duplicate, not an over-collection.
        if store.workflow().guards_duplicate_serials()
            && request.has_serial()
            && snapshot
                .routes_for_item(stock_code, configuration_code)
                .any(|r| r.shares_serial_with(request))
        {
            return Err(ServiceError::DuplicateSerial(format!(
                "Serial {} was already collected for stock '{}' on header {}",
                request.serials().join(", "),
                stock_code,
                snapshot.header.id
            )));
        }

        policy.check_scan(&totals)?;

        let remaining: Vec<(i64, Decimal)> = candidates
            .iter()
            .map(|id| (*id, snapshot.remaining_for_line(*id)))
            .collect();
        let line_id = select_best_fit(&remaining).ok_or_else(|| {
            ServiceError::InternalError("No candidate line to collect on".to_string())
        })?;

        let import_line = match snapshot.find_import_line(line_id, stock_code, configuration_code) {
            Some(existing) => existing.clone(),
            None => {
                let description = snapshot
                    .lines
                    .iter()
                    .find(|l| l.id == line_id)
                    .and_then(|l| l.description.clone());
                store
                    .insert_import_line(
                        txn,
                        NewImportLine {
                            header_id: snapshot.header.id,
                            line_id: Some(line_id),
                            stock_code: stock_code.to_string(),
                            configuration_code: configuration.clone(),
                            description,
                            created_by: Some(ctx.user_id),
                        },
                    )
                    .await?
            }
        };

        let route = store
            .insert_route(
                txn,
                NewRoute {
                    import_line_id: import_line.id,
                    scanned_barcode: request.scanned_barcode.clone(),
                    quantity: request.quantity,
                    serial_no: request.serial_no.clone(),
                    serial_no2: request.serial_no2.clone(),
                    serial_no3: request.serial_no3.clone(),
                    serial_no4: request.serial_no4.clone(),
                    source_cell_code: request.source_cell_code.clone(),
                    target_cell_code: request.target_cell_code.clone(),
                    source_warehouse_code: request
                        .source_warehouse_code
                        .clone()
                        .or_else(|| snapshot.header.source_warehouse_code.clone()),
                    target_warehouse_code: request
                        .target_warehouse_code
                        .clone()
                        .or_else(|| snapshot.header.target_warehouse_code.clone()),
                    description: request.description.clone(),
                    created_by: Some(ctx.user_id),
                },
            )
            .await?;

        let collected_quantity =
            snapshot.routes_of(import_line.id).map(|r| r.quantity).sum::<Decimal>() + route.quantity;
        let mut views = [ImportLineView {
            import_line,
            stock_name: None,
            collected_quantity,
        }];
        populate_stock_names(self.backend.erp.as_ref(), &mut views).await?;
        let [view] = views;

        Ok((view, route))
    }
}
