//! API error handling for the orcapost relay.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::chain::{RegistryError, SessionError, WalletError};
use crate::mail::{ContactError, ContactRequest};

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Field-level validation error (400), rendered as an `errors` array.
    ValidationError,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Too many requests (429).
    TooManyRequests,
    /// Mail transport failure (502).
    TransportError,
    /// Upstream ledger failure (502).
    BadGateway,
    /// Service unavailable (503).
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::TransportError | ErrorCode::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Validation failure response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationBody {
    /// One entry per failed check.
    pub errors: Vec<FieldError>,
}

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Always `"field"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The submitted value.
    pub value: String,
    /// What is wrong with it.
    pub msg: String,
    /// Field name.
    pub path: String,
    /// Always `"body"`.
    pub location: String,
}

impl FieldError {
    /// Create a body field error.
    pub fn new(path: impl Into<String>, value: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: "field".to_string(),
            value: value.into(),
            msg: msg.into(),
            path: path.into(),
            location: "body".to_string(),
        }
    }
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    fields: Vec<FieldError>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create an unprocessable entity error.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    /// Create a rate limit error.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Create an upstream failure error.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadGateway, message)
    }

    /// Create a service unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a validation error from individual field errors.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            fields,
        }
    }

    /// Create a validation error from `validator::ValidationErrors`.
    ///
    /// Fields listed in `order` come first, in that order; any others follow
    /// alphabetically.
    pub fn from_validation_errors(errors: &validator::ValidationErrors, order: &[&str]) -> Self {
        let mut fields: Vec<FieldError> = Vec::new();

        for (field, field_errors) in errors.field_errors() {
            let path = field.to_string();
            for e in field_errors.iter() {
                let value = match e.params.get("value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", path));
                fields.push(FieldError::new(path.clone(), value, msg));
            }
        }

        let rank = |path: &str| order.iter().position(|f| *f == path).unwrap_or(order.len());
        fields.sort_by(|a, b| {
            rank(&a.path)
                .cmp(&rank(&b.path))
                .then_with(|| a.path.cmp(&b.path))
        });

        Self::validation(fields)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        if self.code == ErrorCode::ValidationError {
            return (status, Json(ValidationBody { errors: self.fields })).into_response();
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Invalid(errors) => {
                ApiError::from_validation_errors(&errors, ContactRequest::FIELDS)
            }
            ContactError::InProgress => {
                ApiError::conflict("A submission with this idempotency key is in progress")
            }
            ContactError::KeyReused => ApiError::unprocessable(
                "This idempotency key was already used for a different submission",
            ),
            ContactError::Transport(e) => {
                tracing::error!(error = %e, "Contact mail delivery failed");
                ApiError::new(ErrorCode::TransportError, "Failed to send message")
            }
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::ProviderMissing => ApiError::unavailable("No wallet provider is available"),
            WalletError::PermissionDenied => ApiError::forbidden("Wallet authorization was denied"),
            WalletError::NetworkMismatch { .. } => ApiError::conflict(err.to_string()),
            WalletError::Provider(e) => {
                tracing::error!(error = %e, "Wallet provider failed");
                ApiError::bad_gateway("Wallet provider request failed")
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EmptyContent(reason) | RegistryError::Reverted(reason) => {
                ApiError::unprocessable(reason)
            }
            RegistryError::EventNotFound(_) | RegistryError::ConfirmationTimeout(_) => {
                tracing::error!(error = %err, "Mint did not complete");
                ApiError::bad_gateway(err.to_string())
            }
            RegistryError::Abi(_) | RegistryError::Provider(_) => {
                tracing::error!(error = %err, "Ledger request failed");
                ApiError::bad_gateway("Ledger request failed")
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConfigured => {
                ApiError::unavailable("Message registry is not configured")
            }
            SessionError::Wallet(e) => e.into(),
            SessionError::Registry(e) => e.into(),
        }
    }
}
