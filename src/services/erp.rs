//! Read-only ERP display-name lookups.
//!
//! The ERP system is an external collaborator: it turns stock, customer and warehouse codes into
//! display names. Enrichment never touches fulfillment state, and a lookup failure is handed back
//! to the caller with the collaborator's own status and message.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use http::StatusCode;

use crate::errors::ServiceError;

/// Failure reported by an ERP lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpError {
    pub status: StatusCode,
    pub message: String,
}

impl From<ErpError> for ServiceError {
    fn from(err: ErpError) -> Self {
        ServiceError::Erp {
            status: err.status,
            message: err.message,
        }
    }
}

pub type Names = HashMap<String, String>;

#[async_trait]
pub trait ErpLookup: Send + Sync {
    async fn stock_names(&self, codes: &[String]) -> Result<Names, ErpError>;
    async fn customer_names(&self, codes: &[String]) -> Result<Names, ErpError>;
    async fn warehouse_names(&self, codes: &[String]) -> Result<Names, ErpError>;
}

pub trait StockNamed {
    fn stock_code(&self) -> &str;
    fn set_stock_name(&mut self, name: Option<String>);
}

pub trait CustomerNamed {
    fn customer_code(&self) -> Option<&str>;
    fn set_customer_name(&mut self, name: Option<String>);
}

pub trait WarehouseNamed {
    fn source_warehouse_code(&self) -> Option<&str>;
    fn target_warehouse_code(&self) -> Option<&str>;
    fn set_warehouse_names(&mut self, source: Option<String>, target: Option<String>);
}

fn distinct<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    codes
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn lookup(names: &Names, code: Option<&str>) -> Option<String> {
    code.and_then(|c| names.get(c.trim())).cloned()
}

pub async fn populate_stock_names<T: StockNamed + Send>(
    erp: &dyn ErpLookup,
    items: &mut [T],
) -> Result<(), ServiceError> {
    let codes = distinct(items.iter().map(|i| i.stock_code()));
    if codes.is_empty() {
        return Ok(());
    }
    let names = erp.stock_names(&codes).await?;
    for item in items.iter_mut() {
        let name = lookup(&names, Some(item.stock_code()));
        item.set_stock_name(name);
    }
    Ok(())
}

pub async fn populate_customer_names<T: CustomerNamed + Send>(
    erp: &dyn ErpLookup,
    items: &mut [T],
) -> Result<(), ServiceError> {
    let codes = distinct(items.iter().filter_map(|i| i.customer_code()));
    if codes.is_empty() {
        return Ok(());
    }
    let names = erp.customer_names(&codes).await?;
    for item in items.iter_mut() {
        let name = lookup(&names, item.customer_code());
        item.set_customer_name(name);
    }
    Ok(())
}

pub async fn populate_warehouse_names<T: WarehouseNamed + Send>(
    erp: &dyn ErpLookup,
    items: &mut [T],
) -> Result<(), ServiceError> {
    let codes = distinct(items.iter().flat_map(|i| {
        [i.source_warehouse_code(), i.target_warehouse_code()]
            .into_iter()
            .flatten()
    }));
    if codes.is_empty() {
        return Ok(());
    }
    let names = erp.warehouse_names(&codes).await?;
    for item in items.iter_mut() {
        let source = lookup(&names, item.source_warehouse_code());
        let target = lookup(&names, item.target_warehouse_code());
        item.set_warehouse_names(source, target);
    }
    Ok(())
}

/// In-memory catalog, for tests and for running without an ERP connection.
#[derive(Debug, Clone, Default)]
pub struct StaticErpCatalog {
    stocks: Names,
    customers: Names,
    warehouses: Names,
    failure: Option<ErpError>,
}

impl StaticErpCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, code: &str, name: &str) -> Self {
        self.stocks.insert(code.to_string(), name.to_string());
        self
    }

    pub fn with_customer(mut self, code: &str, name: &str) -> Self {
        self.customers.insert(code.to_string(), name.to_string());
        self
    }

    pub fn with_warehouse(mut self, code: &str, name: &str) -> Self {
        self.warehouses.insert(code.to_string(), name.to_string());
        self
    }

    /// Every lookup fails with the given status and message.
    pub fn failing(status: StatusCode, message: &str) -> Self {
        Self {
            failure: Some(ErpError {
                status,
                message: message.to_string(),
            }),
            ..Self::default()
        }
    }

    fn answer(&self, table: &Names, codes: &[String]) -> Result<Names, ErpError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(codes
            .iter()
            .filter_map(|c| table.get(c).map(|n| (c.clone(), n.clone())))
            .collect())
    }
}

#[async_trait]
impl ErpLookup for StaticErpCatalog {
    async fn stock_names(&self, codes: &[String]) -> Result<Names, ErpError> {
        self.answer(&self.stocks, codes)
    }

    async fn customer_names(&self, codes: &[String]) -> Result<Names, ErpError> {
        self.answer(&self.customers, codes)
    }

    async fn warehouse_names(&self, codes: &[String]) -> Result<Names, ErpError> {
        self.answer(&self.warehouses, codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Debug, Default)]
    struct Item {
        stock: String,
        stock_name: Option<String>,
        source: Option<String>,
        target: Option<String>,
        names: (Option<String>, Option<String>),
    }

    impl StockNamed for Item {
        fn stock_code(&self) -> &str {
            &self.stock
        }
        fn set_stock_name(&mut self, name: Option<String>) {
            self.stock_name = name;
        }
    }

    impl WarehouseNamed for Item {
        fn source_warehouse_code(&self) -> Option<&str> {
            self.source.as_deref()
        }
        fn target_warehouse_code(&self) -> Option<&str> {
            self.target.as_deref()
        }
        fn set_warehouse_names(&mut self, source: Option<String>, target: Option<String>) {
            self.names = (source, target);
        }
    }

    #[tokio::test]
    async fn names_are_filled_by_trimmed_code() {
        let erp = StaticErpCatalog::new()
            .with_stock("A1", "Bolt")
            .with_warehouse("W1", "Main")
            .with_warehouse("W2", "Dock");
        let mut items = vec![
            Item {
                stock: " A1 ".into(),
                source: Some("W1".into()),
                target: Some("W2".into()),
                ..Default::default()
            },
            Item {
                stock: "ZZ".into(),
                ..Default::default()
            },
        ];

        populate_stock_names(&erp, &mut items).await.unwrap();
        populate_warehouse_names(&erp, &mut items).await.unwrap();

        assert_eq!(items[0].stock_name.as_deref(), Some("Bolt"));
        assert_eq!(items[1].stock_name, None);
        assert_eq!(
            items[0].names,
            (Some("Main".to_string()), Some("Dock".to_string()))
        );
    }

    #[tokio::test]
    async fn failures_pass_through_unchanged() {
        let erp = StaticErpCatalog::failing(StatusCode::BAD_GATEWAY, "ERP timeout");
        let mut items = vec![Item {
            stock: "A1".into(),
            ..Default::default()
        }];
        let err = populate_stock_names(&erp, &mut items).await.unwrap_err();
        assert_matches!(
            err,
            ServiceError::Erp { status, ref message }
                if status == StatusCode::BAD_GATEWAY && message == "ERP timeout"
        );
    }

    #[tokio::test]
    async fn nothing_to_look_up_skips_the_call() {
        let erp = StaticErpCatalog::failing(StatusCode::BAD_GATEWAY, "unreachable");
        let mut items: Vec<Item> = Vec::new();
        assert!(populate_stock_names(&erp, &mut items).await.is_ok());
    }
}
