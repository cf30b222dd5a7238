use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use super::DocumentStore;
use crate::models::{
    Header, HeaderSerial, ImportLine, Line, LineSerial, NewHeader, NewHeaderSerial, NewImportLine,
    NewLine, NewLineSerial, NewRoute, NewTerminalLine, Route, TerminalLine, Workflow,
    WorkflowParameter,
};

macro_rules! soft_delete {
    ($entity:ident, $txn:expr, $id:expr, $user_id:expr, $at:expr) => {{
        $entity::ActiveModel {
            id: Set($id),
            is_deleted: Set(true),
            deleted_at: Set(Some($at)),
            deleted_by: Set(Some($user_id)),
            ..Default::default()
        }
        .update($txn)
        .await?;
        Ok(())
    }};
}

/// Implements [`DocumentStore`] over one workflow's table set in `crate::entities`.
macro_rules! document_store {
    ($(#[$meta:meta])* $store:ident, $workflow:expr, $tables:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $store;

        #[async_trait]
        impl DocumentStore for $store {
            fn workflow(&self) -> Workflow {
                $workflow
            }

            async fn find_active_header(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
            ) -> Result<Option<Header>, DbErr> {
                use crate::entities::$tables::header;
                Ok(header::Entity::find_by_id(id)
                    .filter(header::Column::IsDeleted.eq(false))
                    .one(txn)
                    .await?
                    .map(Header::from))
            }

            async fn find_active_line(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
            ) -> Result<Option<Line>, DbErr> {
                use crate::entities::$tables::line;
                Ok(line::Entity::find_by_id(id)
                    .filter(line::Column::IsDeleted.eq(false))
                    .one(txn)
                    .await?
                    .map(Line::from))
            }

            async fn find_active_line_serial(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
            ) -> Result<Option<LineSerial>, DbErr> {
                use crate::entities::$tables::line_serial;
                Ok(line_serial::Entity::find_by_id(id)
                    .filter(line_serial::Column::IsDeleted.eq(false))
                    .one(txn)
                    .await?
                    .map(LineSerial::from))
            }

            async fn find_active_import_line(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
            ) -> Result<Option<ImportLine>, DbErr> {
                use crate::entities::$tables::import_line;
                Ok(import_line::Entity::find_by_id(id)
                    .filter(import_line::Column::IsDeleted.eq(false))
                    .one(txn)
                    .await?
                    .map(ImportLine::from))
            }

            async fn find_active_route(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
            ) -> Result<Option<Route>, DbErr> {
                use crate::entities::$tables::route;
                Ok(route::Entity::find_by_id(id)
                    .filter(route::Column::IsDeleted.eq(false))
                    .one(txn)
                    .await?
                    .map(Route::from))
            }

            async fn active_headers(
                &self,
                txn: &DatabaseTransaction,
                ids: &[i64],
            ) -> Result<Vec<Header>, DbErr> {
                use crate::entities::$tables::header;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let rows = header::Entity::find()
                    .filter(header::Column::Id.is_in(ids.to_vec()))
                    .filter(header::Column::IsDeleted.eq(false))
                    .order_by_asc(header::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(Header::from).collect())
            }

            async fn headers_pending_approval(
                &self,
                txn: &DatabaseTransaction,
                branch_code: &str,
            ) -> Result<Vec<Header>, DbErr> {
                use crate::entities::$tables::header;
                let rows = header::Entity::find()
                    .filter(header::Column::BranchCode.eq(branch_code))
                    .filter(header::Column::IsCompleted.eq(true))
                    .filter(header::Column::IsPendingApproval.eq(true))
                    .filter(header::Column::ApprovalStatus.is_null())
                    .filter(header::Column::IsDeleted.eq(false))
                    .order_by_asc(header::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(Header::from).collect())
            }

            async fn active_lines(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<Vec<Line>, DbErr> {
                use crate::entities::$tables::line;
                let rows = line::Entity::find()
                    .filter(line::Column::HeaderId.eq(header_id))
                    .filter(line::Column::IsDeleted.eq(false))
                    .order_by_asc(line::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(Line::from).collect())
            }

            async fn active_line_serials(
                &self,
                txn: &DatabaseTransaction,
                line_ids: &[i64],
            ) -> Result<Vec<LineSerial>, DbErr> {
                use crate::entities::$tables::line_serial;
                if line_ids.is_empty() {
                    return Ok(Vec::new());
                }
                let rows = line_serial::Entity::find()
                    .filter(line_serial::Column::LineId.is_in(line_ids.to_vec()))
                    .filter(line_serial::Column::IsDeleted.eq(false))
                    .order_by_asc(line_serial::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(LineSerial::from).collect())
            }

            async fn active_header_serials(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<Vec<HeaderSerial>, DbErr> {
                use crate::entities::$tables::header_serial;
                let rows = header_serial::Entity::find()
                    .filter(header_serial::Column::HeaderId.eq(header_id))
                    .filter(header_serial::Column::IsDeleted.eq(false))
                    .order_by_asc(header_serial::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(HeaderSerial::from).collect())
            }

            async fn active_terminal_lines(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<Vec<TerminalLine>, DbErr> {
                use crate::entities::$tables::terminal_line;
                let rows = terminal_line::Entity::find()
                    .filter(terminal_line::Column::HeaderId.eq(header_id))
                    .filter(terminal_line::Column::IsDeleted.eq(false))
                    .order_by_asc(terminal_line::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(TerminalLine::from).collect())
            }

            async fn active_terminal_lines_for_user(
                &self,
                txn: &DatabaseTransaction,
                terminal_user_id: i64,
            ) -> Result<Vec<TerminalLine>, DbErr> {
                use crate::entities::$tables::terminal_line;
                let rows = terminal_line::Entity::find()
                    .filter(terminal_line::Column::TerminalUserId.eq(terminal_user_id))
                    .filter(terminal_line::Column::IsDeleted.eq(false))
                    .order_by_asc(terminal_line::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(TerminalLine::from).collect())
            }

            async fn active_import_lines(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<Vec<ImportLine>, DbErr> {
                use crate::entities::$tables::import_line;
                let rows = import_line::Entity::find()
                    .filter(import_line::Column::HeaderId.eq(header_id))
                    .filter(import_line::Column::IsDeleted.eq(false))
                    .order_by_asc(import_line::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(ImportLine::from).collect())
            }

            async fn active_routes(
                &self,
                txn: &DatabaseTransaction,
                import_line_ids: &[i64],
            ) -> Result<Vec<Route>, DbErr> {
                use crate::entities::$tables::route;
                if import_line_ids.is_empty() {
                    return Ok(Vec::new());
                }
                let rows = route::Entity::find()
                    .filter(route::Column::ImportLineId.is_in(import_line_ids.to_vec()))
                    .filter(route::Column::IsDeleted.eq(false))
                    .order_by_asc(route::Column::Id)
                    .all(txn)
                    .await?;
                Ok(rows.into_iter().map(Route::from).collect())
            }

            async fn insert_header(
                &self,
                txn: &DatabaseTransaction,
                new: NewHeader,
            ) -> Result<Header, DbErr> {
                use crate::entities::$tables::header;
                let model = header::ActiveModel {
                    branch_code: Set(new.branch_code),
                    document_no: Set(new.document_no),
                    customer_code: Set(new.customer_code),
                    source_warehouse_code: Set(new.source_warehouse_code),
                    target_warehouse_code: Set(new.target_warehouse_code),
                    planned_date: Set(new.planned_date),
                    description: Set(new.description),
                    is_completed: Set(false),
                    completion_date: Set(None),
                    is_pending_approval: Set(false),
                    approval_status: Set(None),
                    approved_by_user_id: Set(None),
                    approval_date: Set(None),
                    is_erp_integrated: Set(false),
                    created_by: Set(new.created_by),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_line(
                &self,
                txn: &DatabaseTransaction,
                new: NewLine,
            ) -> Result<Line, DbErr> {
                use crate::entities::$tables::line;
                let model = line::ActiveModel {
                    header_id: Set(new.header_id),
                    stock_code: Set(new.stock_code),
                    configuration_code: Set(new.configuration_code),
                    quantity: Set(new.quantity),
                    unit: Set(new.unit),
                    erp_order_no: Set(new.erp_order_no),
                    erp_order_line_no: Set(new.erp_order_line_no),
                    description: Set(new.description),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_line_serial(
                &self,
                txn: &DatabaseTransaction,
                new: NewLineSerial,
            ) -> Result<LineSerial, DbErr> {
                use crate::entities::$tables::line_serial;
                let model = line_serial::ActiveModel {
                    line_id: Set(new.line_id),
                    quantity: Set(new.quantity),
                    serial_no: Set(new.serial_no),
                    serial_no2: Set(new.serial_no2),
                    serial_no3: Set(new.serial_no3),
                    serial_no4: Set(new.serial_no4),
                    source_cell_code: Set(new.source_cell_code),
                    target_cell_code: Set(new.target_cell_code),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_header_serial(
                &self,
                txn: &DatabaseTransaction,
                new: NewHeaderSerial,
            ) -> Result<HeaderSerial, DbErr> {
                use crate::entities::$tables::header_serial;
                let model = header_serial::ActiveModel {
                    header_id: Set(new.header_id),
                    serial_no: Set(new.serial_no),
                    description: Set(new.description),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_terminal_line(
                &self,
                txn: &DatabaseTransaction,
                new: NewTerminalLine,
            ) -> Result<TerminalLine, DbErr> {
                use crate::entities::$tables::terminal_line;
                let model = terminal_line::ActiveModel {
                    header_id: Set(new.header_id),
                    terminal_user_id: Set(new.terminal_user_id),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_import_line(
                &self,
                txn: &DatabaseTransaction,
                new: NewImportLine,
            ) -> Result<ImportLine, DbErr> {
                use crate::entities::$tables::import_line;
                let model = import_line::ActiveModel {
                    header_id: Set(new.header_id),
                    line_id: Set(new.line_id),
                    stock_code: Set(new.stock_code),
                    configuration_code: Set(new.configuration_code),
                    description: Set(new.description),
                    created_by: Set(new.created_by),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn insert_route(
                &self,
                txn: &DatabaseTransaction,
                new: NewRoute,
            ) -> Result<Route, DbErr> {
                use crate::entities::$tables::route;
                let model = route::ActiveModel {
                    import_line_id: Set(new.import_line_id),
                    scanned_barcode: Set(new.scanned_barcode),
                    quantity: Set(new.quantity),
                    serial_no: Set(new.serial_no),
                    serial_no2: Set(new.serial_no2),
                    serial_no3: Set(new.serial_no3),
                    serial_no4: Set(new.serial_no4),
                    source_cell_code: Set(new.source_cell_code),
                    target_cell_code: Set(new.target_cell_code),
                    source_warehouse_code: Set(new.source_warehouse_code),
                    target_warehouse_code: Set(new.target_warehouse_code),
                    description: Set(new.description),
                    created_by: Set(new.created_by),
                    created_at: Set(Utc::now()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(model.into())
            }

            async fn mark_completed(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
                completed_at: DateTime<Utc>,
                pending_approval: bool,
            ) -> Result<Header, DbErr> {
                use crate::entities::$tables::header;
                let model = header::ActiveModel {
                    id: Set(header_id),
                    is_completed: Set(true),
                    completion_date: Set(Some(completed_at)),
                    is_pending_approval: Set(pending_approval),
                    updated_at: Set(Some(completed_at)),
                    ..Default::default()
                }
                .update(txn)
                .await?;
                Ok(model.into())
            }

            async fn record_approval(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
                approved: bool,
                user_id: i64,
                decided_at: DateTime<Utc>,
            ) -> Result<Header, DbErr> {
                use crate::entities::$tables::header;
                let model = header::ActiveModel {
                    id: Set(header_id),
                    approval_status: Set(Some(approved)),
                    approved_by_user_id: Set(Some(user_id)),
                    approval_date: Set(Some(decided_at)),
                    is_pending_approval: Set(false),
                    updated_at: Set(Some(decided_at)),
                    ..Default::default()
                }
                .update(txn)
                .await?;
                Ok(model.into())
            }

            async fn soft_delete_header(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
                user_id: i64,
                at: DateTime<Utc>,
            ) -> Result<(), DbErr> {
                use crate::entities::$tables::header;
                soft_delete!(header, txn, id, user_id, at)
            }

            async fn soft_delete_line(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
                user_id: i64,
                at: DateTime<Utc>,
            ) -> Result<(), DbErr> {
                use crate::entities::$tables::line;
                soft_delete!(line, txn, id, user_id, at)
            }

            async fn soft_delete_line_serial(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
                user_id: i64,
                at: DateTime<Utc>,
            ) -> Result<(), DbErr> {
                use crate::entities::$tables::line_serial;
                soft_delete!(line_serial, txn, id, user_id, at)
            }

            async fn soft_delete_import_line(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
                user_id: i64,
                at: DateTime<Utc>,
            ) -> Result<(), DbErr> {
                use crate::entities::$tables::import_line;
                soft_delete!(import_line, txn, id, user_id, at)
            }

            async fn soft_delete_route(
                &self,
                txn: &DatabaseTransaction,
                id: i64,
                user_id: i64,
                at: DateTime<Utc>,
            ) -> Result<(), DbErr> {
                use crate::entities::$tables::route;
                soft_delete!(route, txn, id, user_id, at)
            }

            async fn count_active_routes(
                &self,
                txn: &DatabaseTransaction,
                import_line_id: i64,
            ) -> Result<u64, DbErr> {
                use crate::entities::$tables::route;
                route::Entity::find()
                    .filter(route::Column::ImportLineId.eq(import_line_id))
                    .filter(route::Column::IsDeleted.eq(false))
                    .count(txn)
                    .await
            }

            async fn count_active_line_serials(
                &self,
                txn: &DatabaseTransaction,
                line_id: i64,
            ) -> Result<u64, DbErr> {
                use crate::entities::$tables::line_serial;
                line_serial::Entity::find()
                    .filter(line_serial::Column::LineId.eq(line_id))
                    .filter(line_serial::Column::IsDeleted.eq(false))
                    .count(txn)
                    .await
            }

            async fn count_active_lines(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<u64, DbErr> {
                use crate::entities::$tables::line;
                line::Entity::find()
                    .filter(line::Column::HeaderId.eq(header_id))
                    .filter(line::Column::IsDeleted.eq(false))
                    .count(txn)
                    .await
            }

            async fn count_active_import_lines(
                &self,
                txn: &DatabaseTransaction,
                header_id: i64,
            ) -> Result<u64, DbErr> {
                use crate::entities::$tables::import_line;
                import_line::Entity::find()
                    .filter(import_line::Column::HeaderId.eq(header_id))
                    .filter(import_line::Column::IsDeleted.eq(false))
                    .count(txn)
                    .await
            }

            async fn count_active_import_lines_for_line(
                &self,
                txn: &DatabaseTransaction,
                line_id: i64,
            ) -> Result<u64, DbErr> {
                use crate::entities::$tables::import_line;
                import_line::Entity::find()
                    .filter(import_line::Column::LineId.eq(line_id))
                    .filter(import_line::Column::IsDeleted.eq(false))
                    .count(txn)
                    .await
            }

            async fn workflow_parameter(
                &self,
                txn: &DatabaseTransaction,
            ) -> Result<Option<WorkflowParameter>, DbErr> {
                use crate::entities::$tables::parameter;
                Ok(parameter::Entity::find()
                    .filter(parameter::Column::IsDeleted.eq(false))
                    .order_by_asc(parameter::Column::Id)
                    .one(txn)
                    .await?
                    .map(WorkflowParameter::from))
            }

            async fn save_parameter(
                &self,
                txn: &DatabaseTransaction,
                parameter: WorkflowParameter,
            ) -> Result<WorkflowParameter, DbErr> {
                use crate::entities::$tables::parameter as row;
                let existing = self.workflow_parameter(txn).await?;
                let mut active = row::ActiveModel {
                    allow_less_quantity_based_on_order: Set(
                        parameter.allow_less_quantity_based_on_order,
                    ),
                    allow_more_quantity_based_on_order: Set(
                        parameter.allow_more_quantity_based_on_order,
                    ),
                    require_all_order_items_collected: Set(
                        parameter.require_all_order_items_collected,
                    ),
                    require_approval_before_erp: Set(parameter.require_approval_before_erp),
                    updated_at: Set(Some(Utc::now())),
                    is_deleted: Set(false),
                    ..Default::default()
                };
                let model = match existing {
                    Some(current) => {
                        active.id = Set(current.id);
                        active.update(txn).await?
                    }
                    None => active.insert(txn).await?,
                };
                Ok(model.into())
            }
        }
    };
}

document_store!(
    /// Production order store.
    PrStore,
    Workflow::Production,
    pr
);

document_store!(
    /// Shipping order store.
    ShStore,
    Workflow::Shipping,
    sh
);

document_store!(
    /// Subcontracting issue/transfer store.
    SitStore,
    Workflow::Subcontracting,
    sit
);
