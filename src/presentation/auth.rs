use crate::domain::user::{LoginRequest, SignupRequest};
use crate::presentation::handlers::{ApiError, AppState};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

#[instrument(skip(state, req))]
pub async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(email = req.email.as_deref().unwrap_or_default(), "Signup request received");

    let user = state
        .auth_service
        .signup(req.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to sign up user");
            ApiError::from(e)
        })?;

    info!(user_id = user.id, email = %user.email, "User signed up successfully");
    Ok(HttpResponse::Ok().json(MessageResponse::ok(
        "Signup successful! You can now log in.",
    )))
}

#[instrument(skip(state, req))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(email = req.email.as_deref().unwrap_or_default(), "Login request received");

    let user = state
        .auth_service
        .login(req.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to log in");
            ApiError::from(e)
        })?;

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Login successful!")))
}
