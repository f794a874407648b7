use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::upload::UploadRejection;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidParam(String),

    /// An upload batch failed validation; `message` is already localized.
    #[error("{message}")]
    UploadRejected {
        rejection: UploadRejection,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    pub fn product_not_found(id: i64) -> Self {
        ProductError::NotFound(format!("Cannot find product with id: {}", id))
    }

    pub fn category_not_found(id: i64) -> Self {
        ProductError::NotFound(format!("Cannot find category with id: {}", id))
    }

    /// Status code the HTTP layer answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            ProductError::UploadRejected { rejection, .. } => rejection.status(),
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProductError::Validation(messages) => {
                tracing::warn!(?messages, "Rejected invalid input");
                (status, Json(messages)).into_response()
            }
            ProductError::UploadRejected { rejection, message } => {
                tracing::warn!(?rejection, "Rejected upload batch");
                (status, message).into_response()
            }
            other => {
                match &other {
                    ProductError::Io(_) | ProductError::Cache(_) | ProductError::Internal(_) => {
                        tracing::error!(error = %other, "Request failed")
                    }
                    _ => tracing::warn!(error = %other, "Request failed"),
                }
                (status, other.to_string()).into_response()
            }
        }
    }
}

/// Field errors flattened into messages, ordered by field name so responses are stable.
impl From<ValidationErrors> for ProductError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages = fields
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        ProductError::Validation(messages)
    }
}

impl From<std::io::Error> for ProductError {
    fn from(err: std::io::Error) -> Self {
        ProductError::Io(err.to_string())
    }
}

impl From<redis::RedisError> for ProductError {
    fn from(err: redis::RedisError) -> Self {
        ProductError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ProductError {
    fn from(err: serde_json::Error) -> Self {
        ProductError::Cache(err.to_string())
    }
}
