use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, DbErr};

use crate::models::document::normalize_code;
use crate::models::{ids, Header, ImportLine, Line, LineSerial, Route, SerialSlots};
use crate::repositories::DocumentStore;
use crate::services::reconciliation::LineTotals;

/// Active lines, line serials, import lines and routes of one header, loaded once.
#[derive(Debug, Clone)]
pub struct HeaderSnapshot {
    pub header: Header,
    pub lines: Vec<Line>,
    pub line_serials: Vec<LineSerial>,
    pub import_lines: Vec<ImportLine>,
    pub routes: Vec<Route>,
}

impl HeaderSnapshot {
    pub async fn load<S: DocumentStore>(
        store: &S,
        txn: &DatabaseTransaction,
        header: Header,
    ) -> Result<Self, DbErr> {
        let lines = store.active_lines(txn, header.id).await?;
        let line_ids = ids(&lines);
        let line_serials = store.active_line_serials(txn, &line_ids).await?;
        let import_lines = store.active_import_lines(txn, header.id).await?;
        let import_line_ids = ids(&import_lines);
        let routes = store.active_routes(txn, &import_line_ids).await?;

        Ok(Self {
            header,
            lines,
            line_serials,
            import_lines,
            routes,
        })
    }

    /// Lines ordering the given stock and configuration, in id order.
    pub fn matching_lines(&self, stock_code: &str, configuration_code: Option<&str>) -> Vec<&Line> {
        self.lines
            .iter()
            .filter(|l| l.matches(stock_code, configuration_code))
            .collect()
    }

    pub fn line_serials_of(&self, line_id: i64) -> impl Iterator<Item = &LineSerial> + '_ {
        self.line_serials.iter().filter(move |ls| ls.line_id == line_id)
    }

    pub fn routes_of(&self, import_line_id: i64) -> impl Iterator<Item = &Route> + '_ {
        self.routes
            .iter()
            .filter(move |r| r.import_line_id == import_line_id)
    }

    /// Import lines linked to `line_id`.
    pub fn import_lines_of(&self, line_id: i64) -> impl Iterator<Item = &ImportLine> + '_ {
        self.import_lines
            .iter()
            .filter(move |il| il.line_id == Some(line_id))
    }

    /// Import lines collecting for any of `line_ids`: linked directly, or unlinked with the
    /// same stock and configuration.
    pub fn import_lines_collecting(
        &self,
        line_ids: &[i64],
        stock_code: &str,
        configuration_code: Option<&str>,
    ) -> Vec<&ImportLine> {
        self.import_lines
            .iter()
            .filter(|il| match il.line_id {
                Some(id) => line_ids.contains(&id),
                None => il.matches(stock_code, configuration_code),
            })
            .collect()
    }

    /// Routes under every import line of this header with the given stock and configuration.
    pub fn routes_for_item(
        &self,
        stock_code: &str,
        configuration_code: Option<&str>,
    ) -> impl Iterator<Item = &Route> + '_ {
        let import_line_ids: Vec<i64> = self
            .import_lines
            .iter()
            .filter(|il| il.matches(stock_code, configuration_code))
            .map(|il| il.id)
            .collect();
        self.routes
            .iter()
            .filter(move |r| import_line_ids.contains(&r.import_line_id))
    }

    /// Existing import line for (line, stock, configuration).
    pub fn find_import_line(
        &self,
        line_id: i64,
        stock_code: &str,
        configuration_code: Option<&str>,
    ) -> Option<&ImportLine> {
        self.import_lines_of(line_id)
            .find(|il| il.matches(stock_code, configuration_code))
    }

    /// Sum of the line's line-serial quantities.
    pub fn ordered_for_line(&self, line_id: i64) -> Decimal {
        self.line_serials_of(line_id).map(|ls| ls.quantity).sum()
    }

    /// Sum of routes under import lines linked to the line.
    pub fn collected_for_line(&self, line_id: i64) -> Decimal {
        self.import_lines_of(line_id)
            .flat_map(|il| self.routes_of(il.id))
            .map(|r| r.quantity)
            .sum()
    }

    pub fn remaining_for_line(&self, line_id: i64) -> Decimal {
        self.ordered_for_line(line_id) - self.collected_for_line(line_id)
    }

    pub fn line_totals(&self, line: &Line) -> LineTotals {
        LineTotals {
            line_id: line.id,
            stock_code: line.stock_code.clone(),
            configuration_code: line.configuration_code.clone(),
            ordered: self.ordered_for_line(line.id),
            collected: self.collected_for_line(line.id),
        }
    }

    pub fn all_line_totals(&self) -> Vec<LineTotals> {
        self.lines.iter().map(|l| self.line_totals(l)).collect()
    }

    /// True when any line serial of `line_ids` carries a serial number.
    pub fn serial_tracked(&self, line_ids: &[i64]) -> bool {
        self.line_serials
            .iter()
            .any(|ls| line_ids.contains(&ls.line_id) && ls.has_serial())
    }

    /// Line serials of `line_ids` carrying `serial`.
    pub fn line_serials_with(&self, line_ids: &[i64], serial: &str) -> Vec<&LineSerial> {
        self.line_serials
            .iter()
            .filter(|ls| line_ids.contains(&ls.line_id) && ls.carries_serial(serial))
            .collect()
    }

    /// Collected quantity of routes carrying `serial` under the given import lines.
    pub fn collected_for_serial(&self, import_lines: &[&ImportLine], serial: &str) -> Decimal {
        import_lines
            .iter()
            .flat_map(|il| self.routes_of(il.id))
            .filter(|r| r.carries_serial(serial))
            .map(|r| r.quantity)
            .sum()
    }

    /// Collected quantity under import lines that are not linked to any line.
    pub fn unlinked_collected(&self) -> Decimal {
        self.import_lines
            .iter()
            .filter(|il| il.line_id.is_none())
            .flat_map(|il| self.routes_of(il.id))
            .map(|r| r.quantity)
            .sum()
    }
}

/// Trimmed configuration code, `None` when blank.
pub fn clean_configuration(configuration_code: Option<&str>) -> Option<String> {
    let code = normalize_code(configuration_code);
    (!code.is_empty()).then(|| code.to_string())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> HeaderSnapshot {
        HeaderSnapshot {
            header: header(1),
            lines: vec![
                line(10, "A1", Some("CFG")),
                line(11, "A1", Some("CFG")),
                line(12, "B2", None),
            ],
            line_serials: vec![
                line_serial(100, 10, dec!(5), None),
                line_serial(101, 11, dec!(2), None),
                line_serial(102, 12, dec!(3), Some("SN-1")),
                line_serial(103, 12, dec!(1), Some("SN-2")),
            ],
            import_lines: vec![
                import_line(20, Some(10), "A1", Some("CFG")),
                import_line(21, None, "A1", Some("CFG")),
                import_line(22, Some(12), "B2", None),
            ],
            routes: vec![
                route(30, 20, dec!(1), None),
                route(31, 21, dec!(4), None),
                route(32, 22, dec!(1), Some("SN-1")),
            ],
        }
    }

    #[test]
    fn line_totals_count_only_linked_routes() {
        let s = snapshot();
        assert_eq!(s.ordered_for_line(10), dec!(5));
        assert_eq!(s.collected_for_line(10), dec!(1));
        assert_eq!(s.remaining_for_line(11), dec!(2));
        assert_eq!(s.unlinked_collected(), dec!(4));
    }

    #[test]
    fn aggregate_collection_includes_unlinked_matching_import_lines() {
        let s = snapshot();
        let collecting = s.import_lines_collecting(&[10, 11], "A1", Some("CFG"));
        assert_eq!(
            collecting.iter().map(|il| il.id).collect::<Vec<_>>(),
            vec![20, 21]
        );
    }

    #[test]
    fn serial_queries() {
        let s = snapshot();
        assert!(s.serial_tracked(&[12]));
        assert!(!s.serial_tracked(&[10, 11]));
        assert_eq!(s.line_serials_with(&[12], "SN-1").len(), 1);
        let linked: Vec<&ImportLine> = s.import_lines_of(12).collect();
        assert_eq!(s.collected_for_serial(&linked, "SN-1"), dec!(1));
        assert_eq!(s.collected_for_serial(&linked, "SN-2"), Decimal::ZERO);
    }

    #[test]
    fn configuration_is_cleaned() {
        assert_eq!(clean_configuration(Some("  ")), None);
        assert_eq!(clean_configuration(Some(" CFG ")), Some("CFG".to_string()));
        assert_eq!(clean_configuration(None), None);
    }
}
