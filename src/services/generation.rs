use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{
    NewHeader, NewHeaderSerial, NewImportLine, NewLine, NewLineSerial, NewRoute, NewTerminalLine,
    RequestContext,
};
use crate::repositories::DocumentStore;
use crate::services::snapshot::clean_configuration;
use crate::services::WorkflowBackend;

/// Which parent reference of a draft could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum CorrelationKind {
    HeaderKey,
    LineKey,
    ImportLineKey,
}

/// Reference to a parent draft of the same request. The GUID wins when both are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRef {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub guid: Option<Uuid>,
}

impl CorrelationRef {
    pub fn key(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            guid: None,
        }
    }

    pub fn guid(guid: Uuid) -> Self {
        Self {
            key: None,
            guid: Some(guid),
        }
    }

    fn describe(&self) -> String {
        match (&self.guid, &self.key) {
            (Some(guid), _) => guid.to_string(),
            (None, Some(key)) => key.clone(),
            (None, None) => "<missing>".to_string(),
        }
    }
}

/// Correlation identities of the drafts persisted so far in one stage.
#[derive(Debug, Default)]
pub struct CorrelationMap {
    by_key: HashMap<String, i64>,
    by_guid: HashMap<Uuid, i64>,
}

impl CorrelationMap {
    pub fn record(&mut self, key: Option<&str>, guid: Option<Uuid>, id: i64) {
        if let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) {
            self.by_key.insert(key.to_string(), id);
        }
        if let Some(guid) = guid {
            self.by_guid.insert(guid, id);
        }
    }

    pub fn resolve(&self, reference: &CorrelationRef, kind: CorrelationKind) -> Result<i64, ServiceError> {
        let by_guid = reference.guid.and_then(|g| self.by_guid.get(&g));
        let by_key = || {
            reference
                .key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .and_then(|k| self.by_key.get(k))
        };
        by_guid
            .or_else(by_key)
            .copied()
            .ok_or_else(|| ServiceError::InvalidCorrelationKey {
                kind,
                reference: reference.describe(),
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HeaderDraft {
    pub key: Option<String>,
    pub guid: Option<Uuid>,
    /// Defaults to the caller's branch.
    #[validate(length(min = 1, max = 10))]
    pub branch_code: Option<String>,
    #[validate(length(max = 50))]
    pub document_no: Option<String>,
    #[validate(length(max = 50))]
    pub customer_code: Option<String>,
    #[validate(length(max = 20))]
    pub source_warehouse_code: Option<String>,
    #[validate(length(max = 20))]
    pub target_warehouse_code: Option<String>,
    pub planned_date: Option<DateTime<Utc>>,
    #[validate(length(max = 250))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LineDraft {
    pub key: Option<String>,
    pub guid: Option<Uuid>,
    pub header: CorrelationRef,
    #[validate(length(min = 1, max = 50))]
    pub stock_code: String,
    #[validate(length(max = 50))]
    pub configuration_code: Option<String>,
    pub quantity: Decimal,
    #[validate(length(max = 10))]
    pub unit: Option<String>,
    pub erp_order_no: Option<String>,
    pub erp_order_line_no: Option<String>,
    #[validate(length(max = 250))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LineSerialDraft {
    pub line: CorrelationRef,
    pub quantity: Decimal,
    #[validate(length(max = 50))]
    pub serial_no: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no2: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no3: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HeaderSerialDraft {
    pub header: CorrelationRef,
    #[validate(length(min = 1, max = 50))]
    pub serial_no: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalLineDraft {
    pub header: CorrelationRef,
    pub terminal_user_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ImportLineDraft {
    pub key: Option<String>,
    pub guid: Option<Uuid>,
    pub header: CorrelationRef,
    /// Absent for import lines collected without an order line.
    #[serde(default)]
    pub line: Option<CorrelationRef>,
    #[validate(length(min = 1, max = 50))]
    pub stock_code: String,
    #[validate(length(max = 50))]
    pub configuration_code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RouteDraft {
    pub import_line: CorrelationRef,
    #[validate(length(min = 1, max = 75))]
    pub scanned_barcode: String,
    pub quantity: Decimal,
    #[validate(length(max = 50))]
    pub serial_no: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no2: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no3: Option<String>,
    #[validate(length(max = 50))]
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub description: Option<String>,
}

/// A whole order hierarchy submitted in one call, children pointing at parents by correlation
/// key or GUID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOrderRequest {
    #[serde(default)]
    pub headers: Vec<HeaderDraft>,
    #[serde(default)]
    pub lines: Vec<LineDraft>,
    #[serde(default)]
    pub line_serials: Vec<LineSerialDraft>,
    #[serde(default)]
    pub header_serials: Vec<HeaderSerialDraft>,
    #[serde(default)]
    pub terminal_lines: Vec<TerminalLineDraft>,
    #[serde(default)]
    pub import_lines: Vec<ImportLineDraft>,
    #[serde(default)]
    pub routes: Vec<RouteDraft>,
}

impl GenerateOrderRequest {
    /// Field rules and quantity signs, checked before anything is written.
    pub fn check(&self) -> Result<(), ServiceError> {
        if self.headers.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one header is required".to_string(),
            ));
        }
        for draft in &self.headers {
            draft.validate()?;
        }
        for draft in &self.lines {
            draft.validate()?;
            if draft.quantity.is_sign_negative() {
                return Err(ServiceError::ValidationError(format!(
                    "Line quantity for stock {} cannot be negative",
                    draft.stock_code
                )));
            }
        }
        for draft in &self.line_serials {
            draft.validate()?;
            positive(draft.quantity, "Line serial")?;
        }
        for draft in &self.header_serials {
            draft.validate()?;
        }
        for draft in &self.import_lines {
            draft.validate()?;
        }
        for draft in &self.routes {
            draft.validate()?;
            positive(draft.quantity, "Route")?;
        }
        Ok(())
    }
}

fn positive(quantity: Decimal, what: &str) -> Result<(), ServiceError> {
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} quantity must be greater than zero",
            what
        )));
    }
    Ok(())
}

/// Ids generated for each stage, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOrder {
    pub header_ids: Vec<i64>,
    pub line_ids: Vec<i64>,
    pub line_serial_ids: Vec<i64>,
    pub header_serial_ids: Vec<i64>,
    pub terminal_line_ids: Vec<i64>,
    pub import_line_ids: Vec<i64>,
    pub route_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct OrderGenerationService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> OrderGenerationService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    /// Persists a whole order hierarchy in one transaction. An unresolvable parent reference
    /// rolls back every stage.
    #[instrument(skip(self, request, ctx), fields(workflow = %self.backend.store.workflow(), headers = request.headers.len()))]
    pub async fn generate(
        &self,
        request: GenerateOrderRequest,
        ctx: &RequestContext,
    ) -> Result<GeneratedOrder, ServiceError> {
        request.check()?;

        let txn = self.backend.db.begin().await?;
        let outcome = self.persist(&txn, request, ctx).await;
        let generated = finish(txn, outcome).await.map_err(|e| {
            warn!(error = %e, "Order generation rolled back");
            e
        })?;

        info!(
            header_ids = ?generated.header_ids,
            routes = generated.route_ids.len(),
            "Order hierarchy generated"
        );
        self.backend
            .event_sender
            .publish(Event::OrderGenerated {
                workflow: self.backend.store.workflow(),
                header_ids: generated.header_ids.clone(),
            })
            .await;

        Ok(generated)
    }

    async fn persist(
        &self,
        txn: &DatabaseTransaction,
        request: GenerateOrderRequest,
        ctx: &RequestContext,
    ) -> Result<GeneratedOrder, ServiceError> {
        let store = &self.backend.store;
        let mut generated = GeneratedOrder::default();

        let mut headers = CorrelationMap::default();
        for draft in request.headers {
            let header = store
                .insert_header(
                    txn,
                    NewHeader {
                        branch_code: draft
                            .branch_code
                            .unwrap_or_else(|| ctx.branch_code.clone()),
                        document_no: draft.document_no,
                        customer_code: draft.customer_code,
                        source_warehouse_code: draft.source_warehouse_code,
                        target_warehouse_code: draft.target_warehouse_code,
                        planned_date: draft.planned_date,
                        description: draft.description,
                        created_by: Some(ctx.user_id),
                    },
                )
                .await?;
            headers.record(draft.key.as_deref(), draft.guid, header.id);
            generated.header_ids.push(header.id);
        }

        let mut lines = CorrelationMap::default();
        for draft in request.lines {
            let header_id = headers.resolve(&draft.header, CorrelationKind::HeaderKey)?;
            let line = store
                .insert_line(
                    txn,
                    NewLine {
                        header_id,
                        stock_code: draft.stock_code.trim().to_string(),
                        configuration_code: clean_configuration(draft.configuration_code.as_deref()),
                        quantity: draft.quantity,
                        unit: draft.unit,
                        erp_order_no: draft.erp_order_no,
                        erp_order_line_no: draft.erp_order_line_no,
                        description: draft.description,
                    },
                )
                .await?;
            lines.record(draft.key.as_deref(), draft.guid, line.id);
            generated.line_ids.push(line.id);
        }

        for draft in request.line_serials {
            let line_id = lines.resolve(&draft.line, CorrelationKind::LineKey)?;
            let line_serial = store
                .insert_line_serial(
                    txn,
                    NewLineSerial {
                        line_id,
                        quantity: draft.quantity,
                        serial_no: draft.serial_no,
                        serial_no2: draft.serial_no2,
                        serial_no3: draft.serial_no3,
                        serial_no4: draft.serial_no4,
                        source_cell_code: draft.source_cell_code,
                        target_cell_code: draft.target_cell_code,
                    },
                )
                .await?;
            generated.line_serial_ids.push(line_serial.id);
        }

        for draft in request.header_serials {
            let header_id = headers.resolve(&draft.header, CorrelationKind::HeaderKey)?;
            let header_serial = store
                .insert_header_serial(
                    txn,
                    NewHeaderSerial {
                        header_id,
                        serial_no: draft.serial_no,
                        description: draft.description,
                    },
                )
                .await?;
            generated.header_serial_ids.push(header_serial.id);
        }

        for draft in request.terminal_lines {
            let header_id = headers.resolve(&draft.header, CorrelationKind::HeaderKey)?;
            let terminal_line = store
                .insert_terminal_line(
                    txn,
                    NewTerminalLine {
                        header_id,
                        terminal_user_id: draft.terminal_user_id,
                    },
                )
                .await?;
            generated.terminal_line_ids.push(terminal_line.id);
        }

        let mut import_lines = CorrelationMap::default();
        for draft in request.import_lines {
            let header_id = headers.resolve(&draft.header, CorrelationKind::HeaderKey)?;
            let line_id = draft
                .line
                .as_ref()
                .map(|r| lines.resolve(r, CorrelationKind::LineKey))
                .transpose()?;
            let import_line = store
                .insert_import_line(
                    txn,
                    NewImportLine {
                        header_id,
                        line_id,
                        stock_code: draft.stock_code.trim().to_string(),
                        configuration_code: clean_configuration(draft.configuration_code.as_deref()),
                        description: draft.description,
                        created_by: Some(ctx.user_id),
                    },
                )
                .await?;
            import_lines.record(draft.key.as_deref(), draft.guid, import_line.id);
            generated.import_line_ids.push(import_line.id);
        }

        for draft in request.routes {
            let import_line_id =
                import_lines.resolve(&draft.import_line, CorrelationKind::ImportLineKey)?;
            let route = store
                .insert_route(
                    txn,
                    NewRoute {
                        import_line_id,
                        scanned_barcode: draft.scanned_barcode,
                        quantity: draft.quantity,
                        serial_no: draft.serial_no,
                        serial_no2: draft.serial_no2,
                        serial_no3: draft.serial_no3,
                        serial_no4: draft.serial_no4,
                        source_cell_code: draft.source_cell_code,
                        target_cell_code: draft.target_cell_code,
                        source_warehouse_code: draft.source_warehouse_code,
                        target_warehouse_code: draft.target_warehouse_code,
                        description: draft.description,
                        created_by: Some(ctx.user_id),
                    },
                )
                .await?;
            generated.route_ids.push(route.id);
        }

        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn guid_is_preferred_over_key() {
        let guid = Uuid::new_v4();
        let mut map = CorrelationMap::default();
        map.record(Some("H1"), Some(guid), 1);
        map.record(Some("H2"), None, 2);

        let both = CorrelationRef {
            key: Some("H2".into()),
            guid: Some(guid),
        };
        assert_eq!(map.resolve(&both, CorrelationKind::HeaderKey).unwrap(), 1);
        assert_eq!(
            map.resolve(&CorrelationRef::key(" H2 "), CorrelationKind::HeaderKey)
                .unwrap(),
            2
        );
    }

    #[test]
    fn unknown_guid_falls_back_to_key() {
        let mut map = CorrelationMap::default();
        map.record(Some("L1"), None, 5);
        let r = CorrelationRef {
            key: Some("L1".into()),
            guid: Some(Uuid::new_v4()),
        };
        assert_eq!(map.resolve(&r, CorrelationKind::LineKey).unwrap(), 5);
    }

    #[test]
    fn unresolved_reference_names_its_kind() {
        let map = CorrelationMap::default();
        assert_matches!(
            map.resolve(&CorrelationRef::key("L2"), CorrelationKind::LineKey),
            Err(ServiceError::InvalidCorrelationKey { kind: CorrelationKind::LineKey, reference })
                if reference == "L2"
        );
        assert_matches!(
            map.resolve(&CorrelationRef::default(), CorrelationKind::ImportLineKey),
            Err(ServiceError::InvalidCorrelationKey { kind: CorrelationKind::ImportLineKey, .. })
        );
    }

    #[test]
    fn blank_keys_are_not_recorded() {
        let mut map = CorrelationMap::default();
        map.record(Some("  "), None, 1);
        assert!(map
            .resolve(&CorrelationRef::key("  "), CorrelationKind::HeaderKey)
            .is_err());
    }

    #[test]
    fn check_rejects_non_positive_quantities() {
        let mut request = GenerateOrderRequest {
            headers: vec![HeaderDraft::default()],
            routes: vec![RouteDraft {
                import_line: CorrelationRef::key("I1"),
                scanned_barcode: "BC".into(),
                quantity: Decimal::ZERO,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_matches!(request.check(), Err(ServiceError::ValidationError(_)));

        request.routes[0].quantity = dec!(1);
        assert!(request.check().is_ok());

        request.headers.clear();
        assert_matches!(request.check(), Err(ServiceError::ValidationError(_)));
    }
}
