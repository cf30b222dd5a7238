//! Warehouse Fulfillment Library
//!
//! Order-fulfillment reconciliation for the production, shipping and subcontracting workflows:
//! bulk order generation, barcode collection, completion checks, cascading soft deletes and
//! approval.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod models;
pub mod repositories;
pub mod services;

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::errors::ServiceError;

/// Outcome envelope of every fulfillment operation.
///
/// `message_key` selects the localized text, `message` is safe to show to the caller and
/// `exception_message` is the raw diagnostic.
#[derive(Debug, Serialize)]
pub struct OperationResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message_key: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> OperationResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            status_code: 200,
            message_key: "Common.Success".to_string(),
            message: "Operation completed".to_string(),
            exception_message: None,
            data: Some(data),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(err: &ServiceError) -> Self {
        if err.is_server_error() {
            error!(error = %err, "Operation failed unexpectedly");
        }
        Self {
            success: false,
            status_code: err.status_code().as_u16(),
            message_key: err.message_key().to_string(),
            message: err.response_message(),
            exception_message: Some(err.to_string()),
            data: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn from_result(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }
}
