use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, DbErr};

use crate::models::{
    Header, HeaderSerial, ImportLine, Line, LineSerial, NewHeader, NewHeaderSerial, NewImportLine,
    NewLine, NewLineSerial, NewRoute, NewTerminalLine, Route, TerminalLine, Workflow,
    WorkflowParameter,
};

/// Persistence capability for one workflow's document hierarchy.
///
/// Every method runs on the caller's open transaction so a service call commits or rolls back
/// as a unit. `find_active_*`, `active_*` and `count_active_*` never return soft-deleted rows.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn workflow(&self) -> Workflow;

    async fn find_active_header(&self, txn: &DatabaseTransaction, id: i64)
        -> Result<Option<Header>, DbErr>;
    async fn find_active_line(&self, txn: &DatabaseTransaction, id: i64)
        -> Result<Option<Line>, DbErr>;
    async fn find_active_line_serial(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<LineSerial>, DbErr>;
    async fn find_active_import_line(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<ImportLine>, DbErr>;
    async fn find_active_route(&self, txn: &DatabaseTransaction, id: i64)
        -> Result<Option<Route>, DbErr>;

    /// Headers among `ids`, ordered by id.
    async fn active_headers(&self, txn: &DatabaseTransaction, ids: &[i64])
        -> Result<Vec<Header>, DbErr>;
    /// Completed headers of a branch still waiting for an approval decision.
    async fn headers_pending_approval(
        &self,
        txn: &DatabaseTransaction,
        branch_code: &str,
    ) -> Result<Vec<Header>, DbErr>;
    /// Lines of a header, ordered by id.
    async fn active_lines(&self, txn: &DatabaseTransaction, header_id: i64)
        -> Result<Vec<Line>, DbErr>;
    async fn active_line_serials(
        &self,
        txn: &DatabaseTransaction,
        line_ids: &[i64],
    ) -> Result<Vec<LineSerial>, DbErr>;
    async fn active_header_serials(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
    ) -> Result<Vec<HeaderSerial>, DbErr>;
    async fn active_terminal_lines(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
    ) -> Result<Vec<TerminalLine>, DbErr>;
    async fn active_terminal_lines_for_user(
        &self,
        txn: &DatabaseTransaction,
        terminal_user_id: i64,
    ) -> Result<Vec<TerminalLine>, DbErr>;
    /// Import lines of a header, ordered by id.
    async fn active_import_lines(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
    ) -> Result<Vec<ImportLine>, DbErr>;
    async fn active_routes(
        &self,
        txn: &DatabaseTransaction,
        import_line_ids: &[i64],
    ) -> Result<Vec<Route>, DbErr>;

    async fn insert_header(&self, txn: &DatabaseTransaction, new: NewHeader)
        -> Result<Header, DbErr>;
    async fn insert_line(&self, txn: &DatabaseTransaction, new: NewLine) -> Result<Line, DbErr>;
    async fn insert_line_serial(
        &self,
        txn: &DatabaseTransaction,
        new: NewLineSerial,
    ) -> Result<LineSerial, DbErr>;
    async fn insert_header_serial(
        &self,
        txn: &DatabaseTransaction,
        new: NewHeaderSerial,
    ) -> Result<HeaderSerial, DbErr>;
    async fn insert_terminal_line(
        &self,
        txn: &DatabaseTransaction,
        new: NewTerminalLine,
    ) -> Result<TerminalLine, DbErr>;
    async fn insert_import_line(
        &self,
        txn: &DatabaseTransaction,
        new: NewImportLine,
    ) -> Result<ImportLine, DbErr>;
    async fn insert_route(&self, txn: &DatabaseTransaction, new: NewRoute) -> Result<Route, DbErr>;

    async fn mark_completed(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
        completed_at: DateTime<Utc>,
        pending_approval: bool,
    ) -> Result<Header, DbErr>;
    /// Stores an approval decision and clears the pending flag.
    async fn record_approval(
        &self,
        txn: &DatabaseTransaction,
        header_id: i64,
        approved: bool,
        user_id: i64,
        decided_at: DateTime<Utc>,
    ) -> Result<Header, DbErr>;

    async fn soft_delete_header(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;
    async fn soft_delete_line(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;
    async fn soft_delete_line_serial(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;
    async fn soft_delete_import_line(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;
    async fn soft_delete_route(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;

    async fn count_active_routes(&self, txn: &DatabaseTransaction, import_line_id: i64)
        -> Result<u64, DbErr>;
    async fn count_active_line_serials(&self, txn: &DatabaseTransaction, line_id: i64)
        -> Result<u64, DbErr>;
    async fn count_active_lines(&self, txn: &DatabaseTransaction, header_id: i64)
        -> Result<u64, DbErr>;
    async fn count_active_import_lines(&self, txn: &DatabaseTransaction, header_id: i64)
        -> Result<u64, DbErr>;
    async fn count_active_import_lines_for_line(
        &self,
        txn: &DatabaseTransaction,
        line_id: i64,
    ) -> Result<u64, DbErr>;

    /// First non-deleted parameter row, if any.
    async fn workflow_parameter(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<Option<WorkflowParameter>, DbErr>;
    /// Overwrites the active parameter row, creating it when missing.
    async fn save_parameter(
        &self,
        txn: &DatabaseTransaction,
        parameter: WorkflowParameter,
    ) -> Result<WorkflowParameter, DbErr>;
}
