//! Workflow-independent view of the order document hierarchy.
//!
//! Header → Line → LineSerial describes what was ordered; Header → ImportLine → Route records
//! what was physically collected. TerminalLine and HeaderSerial hang directly off the header.
//! Rows are soft-deleted only, so every record carries its tombstone fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::serials::SerialSlots;

/// Root of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub id: i64,
    pub branch_code: String,
    pub document_no: Option<String>,
    pub customer_code: Option<String>,
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub planned_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub is_pending_approval: bool,
    /// `None` while no decision has been taken; `Some(true)` approved, `Some(false)` rejected.
    pub approval_status: Option<bool>,
    pub approved_by_user_id: Option<i64>,
    pub approval_date: Option<DateTime<Utc>>,
    pub is_erp_integrated: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// One ordered stock item, keyed by stock code and configuration code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: i64,
    pub header_id: i64,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub erp_order_no: Option<String>,
    pub erp_order_line_no: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// Quantity breakdown of a line, optionally pinned to serial numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSerial {
    pub id: i64,
    pub line_id: i64,
    pub quantity: Decimal,
    pub serial_no: Option<String>,
    pub serial_no2: Option<String>,
    pub serial_no3: Option<String>,
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSerial {
    pub id: i64,
    pub header_id: i64,
    pub serial_no: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// Assignment of a header to the terminal user allowed to work it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalLine {
    pub id: i64,
    pub header_id: i64,
    pub terminal_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// Collected counterpart of a line, created on the first scan of its stock/configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLine {
    pub id: i64,
    pub header_id: i64,
    pub line_id: Option<i64>,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// One physical scan or movement posted under an import line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub import_line_id: i64,
    pub scanned_barcode: String,
    pub quantity: Decimal,
    pub serial_no: Option<String>,
    pub serial_no2: Option<String>,
    pub serial_no3: Option<String>,
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

/// Per-workflow quantity policy row. A missing row means every flag is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowParameter {
    pub id: i64,
    pub allow_less_quantity_based_on_order: bool,
    pub allow_more_quantity_based_on_order: bool,
    pub require_all_order_items_collected: bool,
    pub require_approval_before_erp: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewHeader {
    pub branch_code: String,
    pub document_no: Option<String>,
    pub customer_code: Option<String>,
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub planned_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewLine {
    pub header_id: i64,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub erp_order_no: Option<String>,
    pub erp_order_line_no: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLineSerial {
    pub line_id: i64,
    pub quantity: Decimal,
    pub serial_no: Option<String>,
    pub serial_no2: Option<String>,
    pub serial_no3: Option<String>,
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHeaderSerial {
    pub header_id: i64,
    pub serial_no: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTerminalLine {
    pub header_id: i64,
    pub terminal_user_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewImportLine {
    pub header_id: i64,
    pub line_id: Option<i64>,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRoute {
    pub import_line_id: i64,
    pub scanned_barcode: String,
    pub quantity: Decimal,
    pub serial_no: Option<String>,
    pub serial_no2: Option<String>,
    pub serial_no3: Option<String>,
    pub serial_no4: Option<String>,
    pub source_cell_code: Option<String>,
    pub target_cell_code: Option<String>,
    pub source_warehouse_code: Option<String>,
    pub target_warehouse_code: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}

/// Identity of any persisted record.
pub trait HasId {
    fn id(&self) -> i64;
}

/// Ids of `records`, in order.
pub fn ids<'a, T: HasId + 'a>(records: impl IntoIterator<Item = &'a T>) -> Vec<i64> {
    records.into_iter().map(HasId::id).collect()
}

pub trait HasHeaderId {
    fn header_id(&self) -> i64;
}

/// Records that assign a header to a terminal user.
pub trait HasTerminalUserId {
    fn terminal_user_id(&self) -> i64;
}

impl HasId for Header {
    fn id(&self) -> i64 {
        self.id
    }
}

impl HasId for Line {
    fn id(&self) -> i64 {
        self.id
    }
}

impl HasId for ImportLine {
    fn id(&self) -> i64 {
        self.id
    }
}

impl HasId for TerminalLine {
    fn id(&self) -> i64 {
        self.id
    }
}

impl HasHeaderId for TerminalLine {
    fn header_id(&self) -> i64 {
        self.header_id
    }
}

impl HasTerminalUserId for TerminalLine {
    fn terminal_user_id(&self) -> i64 {
        self.terminal_user_id
    }
}

impl SerialSlots for LineSerial {
    fn serial_slots(&self) -> [Option<&str>; 4] {
        [
            self.serial_no.as_deref(),
            self.serial_no2.as_deref(),
            self.serial_no3.as_deref(),
            self.serial_no4.as_deref(),
        ]
    }
}

impl SerialSlots for Route {
    fn serial_slots(&self) -> [Option<&str>; 4] {
        [
            self.serial_no.as_deref(),
            self.serial_no2.as_deref(),
            self.serial_no3.as_deref(),
            self.serial_no4.as_deref(),
        ]
    }
}

/// Normalizes a stock or configuration code for matching: trimmed, with `None` equal to blank.
pub fn normalize_code(code: Option<&str>) -> &str {
    code.map(str::trim).unwrap_or("")
}

impl Line {
    pub fn matches(&self, stock_code: &str, configuration_code: Option<&str>) -> bool {
        self.stock_code.trim() == stock_code.trim()
            && normalize_code(self.configuration_code.as_deref())
                == normalize_code(configuration_code)
    }
}

impl ImportLine {
    pub fn matches(&self, stock_code: &str, configuration_code: Option<&str>) -> bool {
        self.stock_code.trim() == stock_code.trim()
            && normalize_code(self.configuration_code.as_deref())
                == normalize_code(configuration_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(stock: &str, config: Option<&str>) -> Line {
        Line {
            id: 1,
            header_id: 1,
            stock_code: stock.to_string(),
            configuration_code: config.map(str::to_string),
            quantity: Decimal::ONE,
            unit: None,
            erp_order_no: None,
            erp_order_line_no: None,
            description: None,
            created_at: Utc::now(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[test]
    fn line_match_trims_both_codes() {
        let l = line(" A1 ", Some("CFG  "));
        assert!(l.matches("A1", Some(" CFG")));
        assert!(!l.matches("A1", Some("CFG2")));
        assert!(!l.matches("A2", Some("CFG")));
    }

    #[test]
    fn missing_configuration_equals_blank() {
        let l = line("A1", None);
        assert!(l.matches("A1", Some("   ")));
        assert!(l.matches("A1", None));
        assert!(!l.matches("A1", Some("X")));
    }

    #[test]
    fn ids_keep_record_order() {
        let mut second = line("B2", None);
        second.id = 9;
        assert_eq!(ids(&[line("A1", None), second]), vec![1, 9]);
        let none: Vec<Line> = Vec::new();
        assert!(ids(&none).is_empty());
    }
}
