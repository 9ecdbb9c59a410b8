use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User};
use crate::infrastructure::config::DatabaseConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(255) NULL,
    email VARCHAR(255) NOT NULL,
    password VARCHAR(255) NOT NULL,
    UNIQUE KEY users_email_unique (email)
)";

/// Connection pool opened once at startup. Construction either yields a
/// pool that has completed a round trip or an error; there is no
/// reconnect loop.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    #[instrument(skip(config), fields(host = %config.host, database = %config.name))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to MySQL at {}:{}/{}",
                    config.host, config.port, config.name
                )
            })?;

        info!(max_connections = config.max_connections, "MySQL pool established");
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create users table")?;
        debug!("users table present");
        Ok(())
    }

    pub fn users(&self) -> MySqlUserRepository {
        MySqlUserRepository {
            pool: self.pool.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn save_user(&self, user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&mut *tx)
            .await;

        let result = match inserted {
            Ok(result) => result,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(email = %user.email, "Insert hit unique email index");
                return Err(DomainError::Conflict(
                    "An account with this email already exists.".to_string(),
                )
                .into());
            }
            Err(e) => return Err(e).context("failed to insert user"),
        };

        tx.commit().await.context("failed to commit user insert")?;

        let id = i64::try_from(result.last_insert_id())
            .context("users.id exceeds the signed 64-bit range")?;
        debug!(user_id = id, "User row committed");

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        })
    }

    #[instrument(skip(self), fields(email = email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password FROM users WHERE email = ? LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up user by email")?;
        Ok(user)
    }
}
