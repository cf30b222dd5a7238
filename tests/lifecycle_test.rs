mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{generate, line, order_request, TestHarness};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use warehouse_fulfillment::{
    entities::pr,
    errors::ServiceError,
    events::Event,
    models::Workflow,
    services::{
        collection::ScanRequest,
        generation::{CorrelationRef, ImportLineDraft, RouteDraft},
        lifecycle::CascadeOutcome,
    },
};

fn scan(header_id: i64, serial: Option<&str>) -> ScanRequest {
    ScanRequest {
        header_id,
        scanned_barcode: "BC-A1".into(),
        stock_code: "A1".into(),
        quantity: dec!(1),
        serial_no: serial.map(Into::into),
        ..Default::default()
    }
}

async fn active_headers(app: &TestHarness) -> u64 {
    pr::header::Entity::find()
        .filter(pr::header::Column::IsDeleted.eq(false))
        .count(app.db.as_ref())
        .await
        .unwrap()
}

#[tokio::test]
async fn deleting_the_last_route_cascades_to_import_line_and_header() {
    let mut app = TestHarness::new().await;
    let mut request = order_request(vec![]);
    request.import_lines.push(ImportLineDraft {
        key: Some("I1".into()),
        header: CorrelationRef::key("H1"),
        stock_code: "A1".into(),
        ..Default::default()
    });
    for barcode in ["R1", "R2"] {
        request.routes.push(RouteDraft {
            import_line: CorrelationRef::key("I1"),
            scanned_barcode: barcode.into(),
            quantity: dec!(1),
            ..Default::default()
        });
    }
    let order = app
        .services
        .production
        .generation
        .generate(request, &app.ctx)
        .await
        .expect("generate");
    let lifecycle = &app.services.production.lifecycle;

    let first = lifecycle
        .delete_route(order.route_ids[0], &app.ctx)
        .await
        .expect("delete first route");
    assert_eq!(first.deleted_import_line_id, None);
    assert!(!first.header_deleted);
    assert_eq!(active_headers(&app).await, 1);

    let last = lifecycle
        .delete_route(order.route_ids[1], &app.ctx)
        .await
        .expect("delete last route");
    assert_eq!(
        last,
        CascadeOutcome {
            header_id: order.header_ids[0],
            deleted_route_id: Some(order.route_ids[1]),
            deleted_import_line_id: Some(order.import_line_ids[0]),
            header_deleted: true,
            ..Default::default()
        }
    );
    assert_eq!(active_headers(&app).await, 0);

    let deleted = pr::header::Entity::find_by_id(order.header_ids[0])
        .one(app.db.as_ref())
        .await
        .unwrap()
        .expect("header row is kept");
    assert!(deleted.is_deleted);
    assert_eq!(deleted.deleted_by, Some(app.ctx.user_id));

    let removed: Vec<Event> = app
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::RecordsRemoved { .. }))
        .collect();
    assert_eq!(removed.len(), 2);
}

#[tokio::test]
async fn import_line_is_kept_while_its_line_still_orders() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(services, &app.ctx, vec![line("L1", "A1", None, vec![(dec!(5), None)])]).await;
    let header_id = order.header_ids[0];
    let view = services
        .collection
        .scan(scan(header_id, None), &app.ctx)
        .await
        .expect("scan");

    let detail = services.queries.order_detail(header_id).await.expect("detail");
    let route_id = detail.import_lines[0].routes[0].id;

    let outcome = services
        .lifecycle
        .delete_route(route_id, &app.ctx)
        .await
        .expect("delete route");
    assert_eq!(outcome.deleted_import_line_id, None);
    assert!(!outcome.header_deleted);

    assert_matches!(
        services
            .lifecycle
            .delete_import_line(view.import_line.id, &app.ctx)
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn import_line_with_routes_cannot_be_deleted() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(services, &app.ctx, vec![line("L1", "A1", None, vec![(dec!(5), None)])]).await;
    let view = services
        .collection
        .scan(scan(order.header_ids[0], None), &app.ctx)
        .await
        .expect("scan");

    let err = services
        .lifecycle
        .delete_import_line(view.import_line.id, &app.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.status_code().as_u16(), 400);
}

#[tokio::test]
async fn serial_in_use_blocks_line_serial_delete() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(
        services,
        &app.ctx,
        vec![line("L1", "A1", None, vec![(dec!(1), Some("SN-1")), (dec!(1), Some("SN-2"))])],
    )
    .await;
    services
        .collection
        .scan(scan(order.header_ids[0], Some("SN-1")), &app.ctx)
        .await
        .expect("scan");

    let err = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(ref m) if m.contains("Routes exist"));

    let active = pr::line_serial::Entity::find()
        .filter(pr::line_serial::Column::IsDeleted.eq(false))
        .count(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(active, 2);
}

#[tokio::test]
async fn line_serial_delete_must_keep_collected_quantity_covered() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(
        services,
        &app.ctx,
        vec![line("L1", "A1", None, vec![(dec!(1), None), (dec!(1), None)])],
    )
    .await;
    let header_id = order.header_ids[0];
    for _ in 0..2 {
        services
            .collection
            .scan(scan(header_id, None), &app.ctx)
            .await
            .expect("scan");
    }

    let err = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InvalidOperation(ref m) if m.contains("Insufficient quantity after delete")
    );
}

#[tokio::test]
async fn deleting_the_last_line_serial_cascades_to_line_and_header() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(
        services,
        &app.ctx,
        vec![line("L1", "A1", None, vec![(dec!(2), None), (dec!(3), None)])],
    )
    .await;

    let first = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .expect("first delete");
    assert_eq!(first.deleted_line_id, None);

    let last = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[1], &app.ctx)
        .await
        .expect("last delete");
    assert_eq!(last.deleted_line_id, Some(order.line_ids[0]));
    assert!(last.header_deleted);
    assert_eq!(active_headers(&app).await, 0);

    assert_matches!(
        services.queries.order_detail(order.header_ids[0]).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn header_survives_while_other_lines_remain() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(
        services,
        &app.ctx,
        vec![
            line("L1", "A1", None, vec![(dec!(1), None)]),
            line("L2", "B2", None, vec![(dec!(1), None)]),
        ],
    )
    .await;

    let outcome = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .expect("delete");
    assert_eq!(outcome.deleted_line_id, Some(order.line_ids[0]));
    assert!(!outcome.header_deleted);
    assert_eq!(active_headers(&app).await, 1);
}

#[tokio::test]
async fn deleted_records_are_not_found_again() {
    let app = TestHarness::new().await;
    let services = &app.services.production;
    let order = generate(services, &app.ctx, vec![line("L1", "A1", None, vec![(dec!(1), None), (dec!(1), None)])]).await;
    services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .expect("delete");

    assert_matches!(
        services
            .lifecycle
            .delete_line_serial(order.line_serial_ids[0], &app.ctx)
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        services.lifecycle.delete_route(12345, &app.ctx).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn routeless_import_line_is_deleted_with_its_empty_header() {
    let app = TestHarness::new().await;
    let mut request = order_request(vec![]);
    request.import_lines.push(ImportLineDraft {
        key: Some("I1".into()),
        header: CorrelationRef::key("H1"),
        stock_code: "A1".into(),
        ..Default::default()
    });
    let order = app
        .services
        .production
        .generation
        .generate(request, &app.ctx)
        .await
        .expect("generate");

    let outcome = app
        .services
        .production
        .lifecycle
        .delete_import_line(order.import_line_ids[0], &app.ctx)
        .await
        .expect("delete import line");

    assert_eq!(
        outcome,
        CascadeOutcome {
            header_id: order.header_ids[0],
            deleted_import_line_id: Some(order.import_line_ids[0]),
            header_deleted: true,
            ..Default::default()
        }
    );
    let import_line = pr::import_line::Entity::find_by_id(order.import_line_ids[0])
        .one(app.db.as_ref())
        .await
        .unwrap()
        .expect("import line row is kept");
    assert!(import_line.is_deleted);
    assert_eq!(active_headers(&app).await, 0);
}

#[tokio::test]
async fn import_line_goes_once_its_line_has_no_serials() {
    let app = TestHarness::new().await;
    let mut request = order_request(vec![line("L1", "A1", None, vec![(dec!(1), None)])]);
    request.import_lines.push(ImportLineDraft {
        key: Some("I1".into()),
        header: CorrelationRef::key("H1"),
        line: Some(CorrelationRef::key("L1")),
        stock_code: "A1".into(),
        ..Default::default()
    });
    let services = &app.services.production;
    let order = services
        .generation
        .generate(request, &app.ctx)
        .await
        .expect("generate");

    let serial = services
        .lifecycle
        .delete_line_serial(order.line_serial_ids[0], &app.ctx)
        .await
        .expect("delete line serial");
    // The import line still hangs off the line.
    assert_eq!(serial.deleted_line_id, None);

    let outcome = services
        .lifecycle
        .delete_import_line(order.import_line_ids[0], &app.ctx)
        .await
        .expect("delete import line");
    assert_eq!(outcome.deleted_import_line_id, Some(order.import_line_ids[0]));
    assert!(!outcome.header_deleted);
    assert_eq!(active_headers(&app).await, 1);
}

#[tokio::test]
async fn deletes_wait_for_the_header_lock() {
    let app = TestHarness::new().await;
    let services = app.services.production.clone();
    let order = generate(
        &services,
        &app.ctx,
        vec![line("L1", "A1", None, vec![(dec!(1), None), (dec!(1), None)])],
    )
    .await;
    let header_id = order.header_ids[0];

    let held = app.locks.acquire(Workflow::Production, header_id).await;
    let delete = {
        let services = services.clone();
        let ctx = app.ctx.clone();
        let id = order.line_serial_ids[0];
        tokio::spawn(async move { services.lifecycle.delete_line_serial(id, &ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!delete.is_finished());

    drop(held);
    let outcome = delete.await.unwrap().expect("delete");
    assert_eq!(outcome.deleted_line_serial_id, Some(order.line_serial_ids[0]));
    assert_eq!(app.locks.tracked(), 0);
}

#[tokio::test]
async fn concurrent_scans_and_deletes_keep_collection_covered() {
    let app = TestHarness::new().await;
    let services = app.services.production.clone();
    let order = generate(
        &services,
        &app.ctx,
        vec![line("L1", "A1", None, vec![(dec!(1), None), (dec!(1), None)])],
    )
    .await;
    let header_id = order.header_ids[0];

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let services = services.clone();
        let ctx = app.ctx.clone();
        tasks.push(tokio::spawn(async move {
            let _ = services.collection.scan(scan(header_id, None), &ctx).await;
        }));
    }
    {
        let services = services.clone();
        let ctx = app.ctx.clone();
        let id = order.line_serial_ids[0];
        tasks.push(tokio::spawn(async move {
            let _ = services.lifecycle.delete_line_serial(id, &ctx).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let summary = services
        .completion
        .collection_summary(header_id)
        .await
        .expect("summary");
    let progress = &summary.lines[0];
    assert!(progress.collected <= progress.ordered, "{:?}", progress);
}
