use crate::application::auth_service::AuthService;
use crate::application::summarization_service::SummarizationService;
use crate::domain::error::DomainError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub auth_service: AuthService,
    pub summarization_service: SummarizationService,
    pub max_upload_bytes: usize,
}

// Every failure leaves the API in this shape
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();

        match self {
            ApiError::Validation(_) => warn!(error = %message, status = %status, "Validation error"),
            ApiError::Conflict(_) => warn!(error = %message, status = %status, "Conflict"),
            ApiError::Unauthorized(_) => warn!(error = %message, status = %status, "Unauthorized"),
            ApiError::ServiceUnavailable(_) => {
                warn!(error = %message, status = %status, "Upstream unavailable")
            }
            ApiError::Upstream(_) => error!(error = %message, status = %status, "Upstream error"),
            ApiError::Internal(_) => error!(error = %message, status = %status, "Internal error"),
        }

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            message,
        })
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            DomainError::ModelLoading(msg) => ApiError::ServiceUnavailable(msg),
            DomainError::Upstream(msg) => ApiError::Upstream(msg),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => domain.into(),
            Err(other) => ApiError::Internal(format!("A server error occurred: {other:#}")),
        }
    }
}

/// Turns body deserialization failures into the uniform error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!(error = %err, "Rejected JSON payload");
    ApiError::Validation(format!("Invalid JSON body: {err}")).into()
}

#[derive(Serialize)]
struct HealthResponse {
    success: bool,
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    info!("Health check requested");
    HttpResponse::Ok().json(HealthResponse {
        success: true,
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_error_response_has_uniform_shape() {
        let response = ApiError::Conflict("taken".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "taken" }));
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::Validation(String::new()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict(String::new()), StatusCode::CONFLICT),
            (DomainError::Unauthorized(String::new()), StatusCode::UNAUTHORIZED),
            (DomainError::ModelLoading(String::new()), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::Upstream(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::Internal(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (domain, status) in cases {
            assert_eq!(ApiError::from(anyhow::Error::from(domain)).status_code(), status);
        }
    }

    #[test]
    fn test_foreign_errors_become_server_errors() {
        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "A server error occurred: disk on fire");
    }
}
