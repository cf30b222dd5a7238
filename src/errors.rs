use http::StatusCode;
use sea_orm::error::DbErr;

use crate::services::generation::CorrelationKind;
use crate::services::reconciliation::QuantityViolation;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid correlation key: {kind} '{reference}' was not generated in this request")]
    InvalidCorrelationKey {
        kind: CorrelationKind,
        reference: String,
    },

    #[error("Quantity violation: {0}")]
    QuantityViolation(QuantityViolation),

    #[error("Duplicate serial: {0}")]
    DuplicateSerial(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Failure reported by the ERP lookup collaborator, passed through unchanged.
    #[error("ERP lookup failed: {message}")]
    Erp { status: StatusCode, message: String },

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<QuantityViolation> for ServiceError {
    fn from(violation: QuantityViolation) -> Self {
        ServiceError::QuantityViolation(violation)
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        ServiceError::NotFound(format!("{} {} does not exist or was deleted", entity, id))
    }

    /// Returns the status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidCorrelationKey { .. }
            | Self::QuantityViolation(_)
            | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateSerial(_) => StatusCode::CONFLICT,
            Self::Erp { status, .. } => *status,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Localization key of the user-facing message.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Common.NotFound",
            Self::ValidationError(_) => "Common.ValidationFailed",
            Self::InvalidCorrelationKey { .. } => "Order.InvalidCorrelationKey",
            Self::QuantityViolation(violation) => violation.rule.message_key(),
            Self::DuplicateSerial(_) => "Collection.DuplicateSerial",
            Self::InvalidOperation(_) => "Common.InvalidOperation",
            Self::Erp { .. } => "Erp.LookupFailed",
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Common.UnexpectedError",
        }
    }

    /// Returns the error message suitable for callers.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::Erp { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reconciliation::QuantityRule;
    use rust_decimal_macros::dec;

    fn violation(rule: QuantityRule) -> QuantityViolation {
        QuantityViolation {
            rule,
            line_ids: vec![7],
            stock_code: "A1".into(),
            configuration_code: Some("CFG".into()),
            serial: None,
            ordered: dec!(10),
            collected: dec!(11),
        }
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidCorrelationKey {
                kind: CorrelationKind::LineKey,
                reference: "L2".into(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(violation(QuantityRule::ExactMatch)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DuplicateSerial("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidOperation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn erp_failures_keep_their_status_and_message() {
        let err = ServiceError::Erp {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "ERP offline".into(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.response_message(), "ERP offline");
        assert!(err.is_server_error());
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("syntax error near FROM".into()));
        assert_eq!(err.response_message(), "Database error");
        assert!(err.to_string().contains("syntax error near FROM"));
    }

    #[test]
    fn quantity_violation_message_names_line_and_totals() {
        let err = ServiceError::from(violation(QuantityRule::CannotBeGreater));
        let diagnostic = err.to_string();
        assert!(diagnostic.contains("line 7"));
        assert!(diagnostic.contains("A1"));
        assert!(diagnostic.contains("CFG"));
        assert!(diagnostic.contains("10"));
        assert!(diagnostic.contains("11"));
        assert_eq!(err.message_key(), "Completion.CannotBeGreater");
    }
}
