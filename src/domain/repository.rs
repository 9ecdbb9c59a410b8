use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user and returns it with its assigned id.
    ///
    /// Fails with `DomainError::Conflict` when the email is already taken.
    async fn save_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
