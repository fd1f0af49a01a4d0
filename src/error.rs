use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("sign in to continue")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("malformed `{collection}` document `{id}`")]
    SchemaMismatch {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("identity provider rejected the request: {code}")]
    Auth { code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth { .. } => StatusCode::UNAUTHORIZED,
            AppError::SchemaMismatch { .. } | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = match &self {
            AppError::Validation(errors) => errors
                .iter()
                .map(FieldError::message)
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Internal(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(axum::extract::multipart::MultipartError);
apperr_impl!(reqwest::Error);
apperr_impl!(std::io::Error);

/// One invalid form field, surfaced inline next to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: ValidationKind,
}

impl FieldError {
    pub fn new(field: &'static str, kind: ValidationKind) -> Self {
        Self { field, kind }
    }

    pub fn message(&self) -> String {
        let field = self.field.replace('_', " ");
        match self.kind {
            ValidationKind::Required => format!("{field} is required"),
            ValidationKind::Email => "enter a valid email address".to_owned(),
            ValidationKind::MinLength(len) => {
                format!("{field} must be at least {len} characters")
            }
            ValidationKind::Underage(age) => {
                format!("you must be at least 18 years old (currently {age})")
            }
            ValidationKind::InvalidDate => format!("{field} is not a valid date"),
            ValidationKind::Mismatch => "passwords do not match".to_owned(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Required,
    Email,
    MinLength(usize),
    Underage(i32),
    InvalidDate,
    Mismatch,
}
