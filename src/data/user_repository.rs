use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};

/// Process-local user store, keyed by id. Used by tests and local runs
/// without a database.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<HashMap<i64, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn save_user(&self, user: NewUser) -> Result<User> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;

        // Mirrors the UNIQUE index on users.email
        if storage.values().any(|u| u.email == user.email) {
            warn!(email = %user.email, "Email already present in storage");
            return Err(DomainError::Conflict(
                "An account with this email already exists.".to_string(),
            )
            .into());
        }

        let id = storage.keys().max().copied().unwrap_or(0) + 1;
        let saved = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        };
        storage.insert(id, saved.clone());
        debug!(user_id = id, email = %saved.email, "User saved to memory storage");
        Ok(saved)
    }

    #[instrument(skip(self), fields(email = email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage.values().find(|u| u.email == email).cloned();
        match &user {
            Some(u) => debug!(user_id = u.id, email = %u.email, "User found in storage"),
            None => trace!(email = email, "User not found in storage"),
        }
        Ok(user)
    }
}
