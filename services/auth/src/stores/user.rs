//! Postgres-backed user store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};
use crate::stores::{StoreError, UserStore};

const USER_COLUMNS: &str = "id, email, password_hash, name, image, is_verified, \
     email_verification_token, email_verification_expiry, reset_token, reset_token_expiry, \
     remember_me_token, oauth_provider, oauth_provider_id, created_at, updated_at";

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        info!("Creating new user: {}", new_user.email);

        let query = format!(
            "INSERT INTO users (email, password_hash, name, image, is_verified, \
             email_verification_token, email_verification_expiry, oauth_provider, oauth_provider_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.name)
            .bind(&new_user.image)
            .bind(new_user.is_verified)
            .bind(&new_user.email_verification_token)
            .bind(new_user.email_verification_expiry)
            .bind(&new_user.oauth_provider)
            .bind(&new_user.oauth_provider_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
                _ => StoreError::Database(e),
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE oauth_provider = $1 AND oauth_provider_id = $2"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_remember_me_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET remember_me_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Single conditional update; the rows-affected count decides the
        // winner when two requests race on the same token.
        let result = sqlx::query(
            "UPDATE users SET is_verified = TRUE, email_verification_token = NULL, \
             email_verification_expiry = NULL, updated_at = now() \
             WHERE email_verification_token = $1 AND email_verification_expiry > $2",
        )
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token = NULL, \
             reset_token_expiry = NULL, updated_at = now() \
             WHERE reset_token = $1 AND reset_token_expiry > $3",
        )
        .bind(token)
        .bind(new_password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn link_oauth(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<User, StoreError> {
        let query = format!(
            "UPDATE users SET oauth_provider = $2, oauth_provider_id = $3, \
             name = COALESCE($4, name), image = COALESCE($5, image), \
             is_verified = TRUE, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(provider)
            .bind(provider_id)
            .bind(name)
            .bind(image)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }
}
