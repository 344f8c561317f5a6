use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input rejected before any data is read. `payload` fields are
    /// merged into the response body next to `message`.
    #[error("{message}")]
    Validation {
        message: String,
        payload: Map<String, Value>,
    },

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let ApiError::Validation { payload, .. } = &mut self {
            payload.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, mut payload } => {
                payload.insert("message".to_string(), Value::String(message));
                Value::Object(payload)
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "request failed");
                json!({ "message": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::validation("metric_value is required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "metric_value is required");
    }

    #[test]
    fn extra_fields_only_attach_to_validation_errors() {
        let err = ApiError::validation("bad").with_field("metric_value", "abc");
        match err {
            ApiError::Validation { payload, .. } => {
                assert_eq!(payload.get("metric_value"), Some(&json!("abc")));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ApiError::from(anyhow::anyhow!("db down")).with_field("ignored", 1);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
