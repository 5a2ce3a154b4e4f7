//! Error handler for padron.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("attributes do not match the declared schema")]
    Schema(Vec<FieldError>),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("identity provider request failed: {0}")]
    Ldap(#[from] ldap3::LdapError),

    #[error("notification channel request failed: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("system clock error: {0}")]
    Time(#[from] std::time::SystemTimeError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("authorization token was not provided")]
    MissingCredential,

    #[error("authorization token is invalid")]
    InvalidCredential,

    #[error("invalid credentials")]
    AuthenticationFailed,

    #[error("user not found")]
    NotFound,

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// Per-field error detail attached to 400 responses.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub(crate) field: String,
    pub(crate) message: String,
}

impl FieldError {
    pub(crate) fn new(
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// JSON body returned on every failure.
///
/// `code` carries the machine-readable taxonomy, `error` a human-readable
/// description which never contains upstream detail.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, error, errors) = match &self {
            ServerError::Validation(validation_errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "There were validation errors with your request.".to_owned(),
                Some(parse_validation_errors(validation_errors)),
            ),

            ServerError::Schema(field_errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Attributes do not match the declared schema.".to_owned(),
                Some(field_errors.clone()),
            ),

            ServerError::Axum(rejection) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
                None,
            ),

            ServerError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "missing_credential",
                "Authorization token was not provided.".to_owned(),
                None,
            ),

            ServerError::InvalidCredential => (
                StatusCode::UNAUTHORIZED,
                "invalid_credential",
                "Authorization token is invalid.".to_owned(),
                None,
            ),

            ServerError::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
                "Invalid credentials. Please verify your username and password and try again."
                    .to_owned(),
                None,
            ),

            ServerError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "User not found.".to_owned(),
                None,
            ),

            // Upstream detail is logged, never returned to the caller.
            err => {
                tracing::error!(error = %err, "server returned 500 status");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    "An internal error occurred while processing the request."
                        .to_owned(),
                    None,
                )
            },
        };

        let body = ErrorBody {
            code,
            error,
            errors,
        };

        match serde_json::to_string(&body) {
            Ok(body) => Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap_or_else(|_| internal_server_error()),
            Err(_) => internal_server_error(),
        }
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "code": "upstream_error",
                "error": "An internal error occurred while processing the request.",
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
