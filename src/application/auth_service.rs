use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{LoginRequest, NewUser, SignupRequest, User};
use crate::infrastructure::security::{hash_password, verify_password};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

const MISSING_FIELDS: &str = "Missing required fields.";
const EMAIL_TAKEN: &str = "An account with this email already exists.";
const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    #[instrument(skip(self, req), fields(email = req.email.as_deref().unwrap_or_default()))]
    pub async fn signup(&self, req: SignupRequest) -> Result<User> {
        trace!("Starting signup");
        let (email, password) = required_credentials(req.email, req.password)?;

        if self.user_repository.find_user_by_email(&email).await?.is_some() {
            warn!(email = %email, "Signup for an existing email");
            return Err(DomainError::Conflict(EMAIL_TAKEN.to_string()).into());
        }

        let password_hash = hash_password(&password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let username = req.username.filter(|name| !name.trim().is_empty());
        debug!(email = %email, "Saving user to repository");
        let user = self
            .user_repository
            .save_user(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "User signed up");
        Ok(user)
    }

    /// Checks the credentials; issues nothing on success.
    #[instrument(skip(self, req), fields(email = req.email.as_deref().unwrap_or_default()))]
    pub async fn login(&self, req: LoginRequest) -> Result<User> {
        trace!("Starting login");
        let (email, password) = required_credentials(req.email, req.password)?;

        let user = self
            .user_repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "User not found during login");
                DomainError::Unauthorized(INVALID_CREDENTIALS.to_string())
            })?;

        // An unparsable stored hash can never verify
        let is_valid = verify_password(&password, &user.password_hash).unwrap_or_else(|e| {
            error!(user_id = user.id, error = %e, "Stored password hash is unreadable");
            false
        });

        if !is_valid {
            warn!(user_id = user.id, "Invalid password during login");
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
        }

        info!(user_id = user.id, email = %user.email, "Login successful");
        Ok(user)
    }
}

fn required_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), DomainError> {
    let email = email.filter(|value| !value.trim().is_empty());
    let password = password.filter(|value| !value.is_empty());
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(DomainError::Validation(MISSING_FIELDS.to_string())),
    }
}
