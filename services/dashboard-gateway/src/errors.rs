use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use sheet_ledger::Error as LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Message returned for every server-side failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Permission store error: {0}")]
    Permissions(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Every ledger failure, record validation included, is a server error.
/// Only an empty or malformed body is the caller's fault.
impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        GatewayError::Ledger(err)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.public_message(),
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Permissions(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl GatewayError {
    /// Caller-facing message. Server-side failures never leak detail.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    fn error_type(&self) -> &str {
        match self {
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::Ledger(_) => "ledger_error",
            GatewayError::Identity(_) => "identity_error",
            GatewayError::Permissions(_) => "permission_error",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}
