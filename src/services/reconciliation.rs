//! Quantity conservation rules shared by barcode collection and order completion.
//!
//! Everything here is pure: callers gather ordered and collected totals (see
//! [`crate::services::snapshot::HeaderSnapshot`]) and ask the policy whether they are acceptable.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::WorkflowParameter;

/// Tolerance for decimal quantity comparisons.
pub const QUANTITY_EPSILON: Decimal = dec!(0.000001);

/// The rule a quantity check failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityRule {
    /// Neither less nor more than ordered is allowed.
    ExactMatch,
    CannotBeGreater,
    CannotBeLess,
    /// A line with nothing collected while every item must be collected.
    AllItemsRequired,
    /// A scan would push the collected total above the ordered total.
    ScanExceedsOrder,
}

impl QuantityRule {
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::ExactMatch => "Completion.ExactMatchRequired",
            Self::CannotBeGreater => "Completion.CannotBeGreater",
            Self::CannotBeLess => "Completion.CannotBeLess",
            Self::AllItemsRequired => "Completion.AllOrderItemsMustBeCollected",
            Self::ScanExceedsOrder => "Collection.QuantityExceedsOrder",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::ExactMatch => "collected quantity must equal the ordered quantity",
            Self::CannotBeGreater => "collected quantity cannot be greater than ordered",
            Self::CannotBeLess => "collected quantity cannot be less than ordered",
            Self::AllItemsRequired => "all order items must be collected",
            Self::ScanExceedsOrder => "scan would exceed the ordered quantity",
        }
    }
}

/// A failed quantity check, naming the line(s), item and both totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityViolation {
    pub rule: QuantityRule,
    pub line_ids: Vec<i64>,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub serial: Option<String>,
    pub ordered: Decimal,
    pub collected: Decimal,
}

impl fmt::Display for QuantityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = self
            .line_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if self.line_ids.len() == 1 { "line" } else { "lines" };
        write!(
            f,
            "{} ({} {}, stock '{}', configuration '{}'",
            self.rule.describe(),
            noun,
            ids,
            self.stock_code,
            self.configuration_code.as_deref().unwrap_or(""),
        )?;
        if let Some(serial) = &self.serial {
            write!(f, ", serial '{}'", serial)?;
        }
        write!(
            f,
            "): ordered {}, collected {}",
            self.ordered.normalize(),
            self.collected.normalize()
        )
    }
}

/// Ordered and collected totals of one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTotals {
    pub line_id: i64,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub ordered: Decimal,
    pub collected: Decimal,
}

impl LineTotals {
    pub fn remaining(&self) -> Decimal {
        self.ordered - self.collected
    }
}

/// Totals a scan is checked against, before the scan is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTotals {
    pub line_ids: Vec<i64>,
    pub stock_code: String,
    pub configuration_code: Option<String>,
    pub serial: Option<String>,
    pub ordered: Decimal,
    pub collected: Decimal,
    pub scanned: Decimal,
}

impl ScanTotals {
    pub fn projected(&self) -> Decimal {
        self.collected + self.scanned
    }
}

/// Result of checking one line at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCheck {
    Passed,
    /// Nothing collected and collection is optional.
    Skipped,
}

/// Workflow quantity policy. A missing parameter row yields the strictest policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityPolicy {
    pub allow_less: bool,
    pub allow_more: bool,
    pub require_all_collected: bool,
    pub require_approval: bool,
}

impl QuantityPolicy {
    pub fn from_parameter(parameter: Option<&WorkflowParameter>) -> Self {
        parameter
            .map(|p| Self {
                allow_less: p.allow_less_quantity_based_on_order,
                allow_more: p.allow_more_quantity_based_on_order,
                require_all_collected: p.require_all_order_items_collected,
                require_approval: p.require_approval_before_erp,
            })
            .unwrap_or_default()
    }

    /// Both directions tolerated: the ordered/collected comparison is skipped.
    pub fn anything_goes(&self) -> bool {
        self.allow_less && self.allow_more
    }

    /// Completion-time check of one line.
    pub fn check_line(&self, totals: &LineTotals) -> Result<LineCheck, QuantityViolation> {
        if totals.collected.is_zero() {
            if self.require_all_collected {
                return Err(self.violation(QuantityRule::AllItemsRequired, totals));
            }
            return Ok(LineCheck::Skipped);
        }

        if self.anything_goes() {
            return Ok(LineCheck::Passed);
        }

        let diff = totals.collected - totals.ordered;
        let rule = match (self.allow_less, self.allow_more) {
            (false, false) if diff.abs() >= QUANTITY_EPSILON => Some(QuantityRule::ExactMatch),
            (true, false) if diff > QUANTITY_EPSILON => Some(QuantityRule::CannotBeGreater),
            (false, true) if -diff > QUANTITY_EPSILON => Some(QuantityRule::CannotBeLess),
            _ => None,
        };

        match rule {
            Some(rule) => Err(self.violation(rule, totals)),
            None => Ok(LineCheck::Passed),
        }
    }

    /// Scan-time check. Only over-collection is rejected, and only when it is not allowed.
    pub fn check_scan(&self, totals: &ScanTotals) -> Result<(), QuantityViolation> {
        if self.allow_more || totals.projected() - totals.ordered <= QUANTITY_EPSILON {
            return Ok(());
        }
        Err(QuantityViolation {
            rule: QuantityRule::ScanExceedsOrder,
            line_ids: totals.line_ids.clone(),
            stock_code: totals.stock_code.clone(),
            configuration_code: totals.configuration_code.clone(),
            serial: totals.serial.clone(),
            ordered: totals.ordered,
            collected: totals.projected(),
        })
    }

    fn violation(&self, rule: QuantityRule, totals: &LineTotals) -> QuantityViolation {
        QuantityViolation {
            rule,
            line_ids: vec![totals.line_id],
            stock_code: totals.stock_code.clone(),
            configuration_code: totals.configuration_code.clone(),
            serial: None,
            ordered: totals.ordered,
            collected: totals.collected,
        }
    }
}
