use std::collections::BTreeSet;

use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::transaction::finish;
use crate::errors::ServiceError;
use crate::models::{
    ApprovalState, HasHeaderId, HasTerminalUserId, Header, HeaderSerial, ImportLine, Line,
    LineSerial, RequestContext, Route, TerminalLine,
};
use crate::repositories::DocumentStore;
use crate::services::erp::{
    populate_customer_names, populate_stock_names, populate_warehouse_names, CustomerNamed,
    StockNamed, WarehouseNamed,
};
use crate::services::snapshot::HeaderSnapshot;
use crate::services::WorkflowBackend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderView {
    #[serde(flatten)]
    pub header: Header,
    pub state: ApprovalState,
    pub customer_name: Option<String>,
    pub source_warehouse_name: Option<String>,
    pub target_warehouse_name: Option<String>,
}

impl From<Header> for HeaderView {
    fn from(header: Header) -> Self {
        Self {
            state: ApprovalState::of(&header),
            header,
            customer_name: None,
            source_warehouse_name: None,
            target_warehouse_name: None,
        }
    }
}

impl CustomerNamed for HeaderView {
    fn customer_code(&self) -> Option<&str> {
        self.header.customer_code.as_deref()
    }

    fn set_customer_name(&mut self, name: Option<String>) {
        self.customer_name = name;
    }
}

impl WarehouseNamed for HeaderView {
    fn source_warehouse_code(&self) -> Option<&str> {
        self.header.source_warehouse_code.as_deref()
    }

    fn target_warehouse_code(&self) -> Option<&str> {
        self.header.target_warehouse_code.as_deref()
    }

    fn set_warehouse_names(&mut self, source: Option<String>, target: Option<String>) {
        self.source_warehouse_name = source;
        self.target_warehouse_name = target;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetail {
    #[serde(flatten)]
    pub line: Line,
    pub stock_name: Option<String>,
    pub ordered: Decimal,
    pub collected: Decimal,
    pub remaining: Decimal,
    pub serials: Vec<LineSerial>,
}

impl StockNamed for LineDetail {
    fn stock_code(&self) -> &str {
        &self.line.stock_code
    }

    fn set_stock_name(&mut self, name: Option<String>) {
        self.stock_name = name;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLineDetail {
    #[serde(flatten)]
    pub import_line: ImportLine,
    pub stock_name: Option<String>,
    pub collected_quantity: Decimal,
    pub routes: Vec<Route>,
}

impl StockNamed for ImportLineDetail {
    fn stock_code(&self) -> &str {
        &self.import_line.stock_code
    }

    fn set_stock_name(&mut self, name: Option<String>) {
        self.stock_name = name;
    }
}

/// The whole active hierarchy of one header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub header: HeaderView,
    pub lines: Vec<LineDetail>,
    pub import_lines: Vec<ImportLineDetail>,
    pub terminal_lines: Vec<TerminalLine>,
    pub header_serials: Vec<HeaderSerial>,
}

/// Distinct headers assigned to `user_id`, in id order.
pub fn assigned_header_ids<T: HasHeaderId + HasTerminalUserId>(
    assignments: &[T],
    user_id: i64,
) -> Vec<i64> {
    assignments
        .iter()
        .filter(|a| a.terminal_user_id() == user_id)
        .map(|a| a.header_id())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Clone)]
pub struct OrderQueryService<S: DocumentStore> {
    backend: WorkflowBackend<S>,
}

impl<S: DocumentStore> OrderQueryService<S> {
    pub fn new(backend: WorkflowBackend<S>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self), fields(workflow = %self.backend.store.workflow()))]
    pub async fn order_detail(&self, header_id: i64) -> Result<OrderDetail, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self.load_detail(&txn, header_id).await;
        let mut detail = finish(txn, outcome).await?;

        let erp = self.backend.erp.as_ref();
        let headers = std::slice::from_mut(&mut detail.header);
        populate_customer_names(erp, headers).await?;
        populate_warehouse_names(erp, headers).await?;
        populate_stock_names(erp, &mut detail.lines).await?;
        populate_stock_names(erp, &mut detail.import_lines).await?;
        Ok(detail)
    }

    async fn load_detail(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
    ) -> Result<OrderDetail, ServiceError> {
        let store = &self.backend.store;
        let header = store
            .find_active_header(txn, header_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Header", header_id))?;
        let terminal_lines = store.active_terminal_lines(txn, header_id).await?;
        let header_serials = store.active_header_serials(txn, header_id).await?;
        let snapshot = HeaderSnapshot::load(store, txn, header).await?;

        let lines = snapshot
            .lines
            .iter()
            .map(|line| {
                let totals = snapshot.line_totals(line);
                LineDetail {
                    line: line.clone(),
                    stock_name: None,
                    ordered: totals.ordered,
                    collected: totals.collected,
                    remaining: totals.remaining(),
                    serials: snapshot.line_serials_of(line.id).cloned().collect(),
                }
            })
            .collect();
        let import_lines = snapshot
            .import_lines
            .iter()
            .map(|il| {
                let routes: Vec<Route> = snapshot.routes_of(il.id).cloned().collect();
                ImportLineDetail {
                    import_line: il.clone(),
                    stock_name: None,
                    collected_quantity: routes.iter().map(|r| r.quantity).sum(),
                    routes,
                }
            })
            .collect();

        Ok(OrderDetail {
            header: HeaderView::from(snapshot.header.clone()),
            lines,
            import_lines,
            terminal_lines,
            header_serials,
        })
    }

    /// Open headers of the caller's branch assigned to the caller through terminal lines.
    #[instrument(skip(self, ctx), fields(workflow = %self.backend.store.workflow(), user_id = ctx.user_id))]
    pub async fn assigned_orders(&self, ctx: &RequestContext) -> Result<Vec<HeaderView>, ServiceError> {
        let txn = self.backend.db.begin().await?;
        let outcome = self.load_assigned(&txn, ctx).await;
        let mut views = finish(txn, outcome).await?;

        let erp = self.backend.erp.as_ref();
        populate_customer_names(erp, &mut views).await?;
        populate_warehouse_names(erp, &mut views).await?;
        Ok(views)
    }

    async fn load_assigned(
        &self,
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
    ) -> Result<Vec<HeaderView>, ServiceError> {
        let store = &self.backend.store;
        let assignments = store.active_terminal_lines_for_user(txn, ctx.user_id).await?;
        let ids = assigned_header_ids(&assignments, ctx.user_id);
        let headers = store.active_headers(txn, &ids).await?;

        Ok(headers
            .into_iter()
            .filter(|h| !h.is_completed && h.branch_code == ctx.branch_code)
            .map(HeaderView::from)
            .collect())
    }
}
