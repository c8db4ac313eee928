use std::fmt;
use serde::{Deserialize, Serialize};
use crate::errors::{DomainError, DbError, ServiceError, ValidationError};

/// Error codes for FFI boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Success (no error)
    Success = 0,

    // General errors (1-99)
    InvalidArgument = 2,
    NullPointer = 3,
    InvalidUtf8 = 4,
    InternalError = 6,
    NotInitialized = 7,

    // Database errors (100-199)
    DatabaseGeneral = 100,
    DatabaseConnection = 104,

    // Domain errors (200-299)
    ValidationFailed = 204,
    SourceUnavailable = 209,

    // Service errors (300-399)
    ServiceUnavailable = 309,
    ConfigurationError = 310,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// Error type for FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFIError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (JSON string)
    pub details: Option<String>,
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for FFIError {}

impl FFIError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: &str, details: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, &message)
    }

    pub fn from_service_error(err: ServiceError) -> Self {
        err.into()
    }
}

impl From<DbError> for FFIError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(sqlx_err) => {
                Self::new(ErrorCode::DatabaseGeneral, &sqlx_err.to_string())
            },
            DbError::ConnectionPool(msg) => {
                Self::new(ErrorCode::DatabaseConnection, &msg)
            },
            DbError::Query(msg) | DbError::Other(msg) => {
                Self::new(ErrorCode::DatabaseGeneral, &msg)
            },
        }
    }
}

impl From<ValidationError> for FFIError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::Required { field }
            | ValidationError::Range { field, .. }
            | ValidationError::Format { field, .. } => field.clone(),
        };
        Self::with_details(
            ErrorCode::ValidationFailed,
            &err.to_string(),
            &format!("{{\"field\":\"{}\"}}", field),
        )
    }
}

impl From<DomainError> for FFIError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Database(db_err) => {
                db_err.into() // Delegate to From<DbError>
            },
            DomainError::Validation(val_err) => {
                val_err.into() // Delegate to From<ValidationError>
            },
            DomainError::SourceUnavailable { source_name, reason } => {
                Self::with_details(
                    ErrorCode::SourceUnavailable,
                    &format!("Source unavailable: {}", source_name),
                    &serde_json::json!({ "source": source_name, "reason": reason }).to_string(),
                )
            },
            DomainError::Internal(msg) => {
                Self::new(ErrorCode::InternalError, &msg)
            },
        }
    }
}

impl From<ServiceError> for FFIError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(domain_err) => {
                domain_err.into() // Delegate
            },
            ServiceError::Configuration(msg) => {
                Self::new(ErrorCode::ConfigurationError, &msg)
            },
            ServiceError::ServiceUnavailable(msg) => {
                Self::new(ErrorCode::ServiceUnavailable, &msg)
            },
        }
    }
}

/// Result type for FFI operations
pub type FFIResult<T> = Result<T, FFIError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unavailable_maps_to_distinct_code() {
        let err: FFIError = ServiceError::Domain(DomainError::source_unavailable("kenya.geojson", "No such file")).into();
        assert_eq!(err.code, ErrorCode::SourceUnavailable);
        let details: serde_json::Value = serde_json::from_str(err.details.as_deref().unwrap()).unwrap();
        assert_eq!(details["source"], "kenya.geojson");
        assert_eq!(details["reason"], "No such file");
    }

    #[test]
    fn test_validation_error_carries_field() {
        let err: FFIError = DomainError::Validation(ValidationError::required("database_url")).into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.as_deref(), Some("{\"field\":\"database_url\"}"));
        assert_eq!(err.code as i32, 204);
    }
}
