#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use warehouse_fulfillment::{
    db::{self, DbConfig, DbPool},
    events::{Event, EventSender},
    models::RequestContext,
    repositories::DocumentStore,
    services::{
        erp::{ErpLookup, StaticErpCatalog},
        generation::{
            CorrelationRef, GenerateOrderRequest, GeneratedOrder, HeaderDraft, LineDraft,
            LineSerialDraft, TerminalLineDraft,
        },
        locks::HeaderLocks,
        reconciliation::QuantityPolicy,
        AppServices, WorkflowServices,
    },
};

/// Services of every workflow over a fresh in-memory SQLite database.
pub struct TestHarness {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub events: mpsc::Receiver<Event>,
    pub locks: Arc<HeaderLocks>,
    pub ctx: RequestContext,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_erp(default_catalog()).await
    }

    pub async fn with_erp(erp: impl ErpLookup + 'static) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to open in-memory database");
        db::create_schema(&pool).await.expect("schema");
        let db = Arc::new(pool);

        let (event_sender, events) = EventSender::channel(256);
        let locks = Arc::new(HeaderLocks::new(true));
        let services = AppServices::new(
            db.clone(),
            Arc::new(erp),
            Arc::new(event_sender),
            locks.clone(),
        );

        Self {
            db,
            services,
            events,
            locks,
            ctx: RequestContext::new(7, "01"),
        }
    }

    /// Events published so far, without waiting.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

pub fn default_catalog() -> StaticErpCatalog {
    StaticErpCatalog::new()
        .with_stock("A1", "Hex bolt M8")
        .with_stock("B2", "Washer 8mm")
        .with_customer("C100", "Acme Components")
        .with_warehouse("W1", "Main warehouse")
        .with_warehouse("W2", "Shipping dock")
}

pub fn policy(allow_less: bool, allow_more: bool, require_all: bool) -> QuantityPolicy {
    QuantityPolicy {
        allow_less,
        allow_more,
        require_all_collected: require_all,
        require_approval: false,
    }
}

/// One order line: stock, configuration, and the line serials as (quantity, serial).
pub struct LineFixture {
    pub key: &'static str,
    pub stock: &'static str,
    pub config: Option<&'static str>,
    pub serials: Vec<(Decimal, Option<&'static str>)>,
}

pub fn line(
    key: &'static str,
    stock: &'static str,
    config: Option<&'static str>,
    serials: Vec<(Decimal, Option<&'static str>)>,
) -> LineFixture {
    LineFixture {
        key,
        stock,
        config,
        serials,
    }
}

/// A header `H1` with the given lines, assigned to the harness user.
pub fn order_request(lines: Vec<LineFixture>) -> GenerateOrderRequest {
    let mut request = GenerateOrderRequest {
        headers: vec![HeaderDraft {
            key: Some("H1".into()),
            document_no: Some("WO-1001".into()),
            customer_code: Some("C100".into()),
            source_warehouse_code: Some("W1".into()),
            target_warehouse_code: Some("W2".into()),
            ..Default::default()
        }],
        terminal_lines: vec![TerminalLineDraft {
            header: CorrelationRef::key("H1"),
            terminal_user_id: 7,
        }],
        ..Default::default()
    };
    for fixture in lines {
        let ordered: Decimal = fixture.serials.iter().map(|(q, _)| *q).sum();
        request.lines.push(LineDraft {
            key: Some(fixture.key.into()),
            header: CorrelationRef::key("H1"),
            stock_code: fixture.stock.into(),
            configuration_code: fixture.config.map(Into::into),
            quantity: ordered,
            ..Default::default()
        });
        for (quantity, serial) in fixture.serials {
            request.line_serials.push(LineSerialDraft {
                line: CorrelationRef::key(fixture.key),
                quantity,
                serial_no: serial.map(Into::into),
                ..Default::default()
            });
        }
    }
    request
}

pub async fn generate<S: DocumentStore>(
    services: &WorkflowServices<S>,
    ctx: &RequestContext,
    lines: Vec<LineFixture>,
) -> GeneratedOrder {
    services
        .generation
        .generate(order_request(lines), ctx)
        .await
        .expect("order generation")
}
