//! In-memory store doubles for tests
//!
//! These mirror the conditional-update semantics of the Postgres stores so
//! service-level tests exercise the same at-most-once guarantees without a
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{NewUser, TrialCode, User};
use crate::stores::{StoreError, TrialCodeStore, UserStore};

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            image: new_user.image,
            is_verified: new_user.is_verified,
            email_verification_token: new_user.email_verification_token,
            email_verification_expiry: new_user.email_verification_expiry,
            reset_token: None,
            reset_token_expiry: None,
            remember_me_token: None,
            oauth_provider: new_user.oauth_provider,
            oauth_provider_id: new_user.oauth_provider_id,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|u| {
                u.oauth_provider.as_deref() == Some(provider)
                    && u.oauth_provider_id.as_deref() == Some(provider_id)
            })
            .cloned())
    }

    async fn set_remember_me_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.remember_me_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expiry = Some(expiry);
        }
        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().await;
        let matching = users.values_mut().find(|u| {
            u.email_verification_token.as_deref() == Some(token)
                && u.email_verification_expiry.is_some_and(|exp| exp > now)
        });

        match matching {
            Some(user) => {
                user.is_verified = true;
                user.email_verification_token = None;
                user.email_verification_expiry = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().await;
        let matching = users.values_mut().find(|u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expiry.is_some_and(|exp| exp > now)
        });

        match matching {
            Some(user) => {
                user.password_hash = Some(new_password_hash.to_string());
                user.reset_token = None;
                user.reset_token_expiry = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn link_oauth(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;

        user.oauth_provider = Some(provider.to_string());
        user.oauth_provider_id = Some(provider_id.to_string());
        if let Some(name) = name {
            user.name = Some(name.to_string());
        }
        if let Some(image) = image {
            user.image = Some(image.to_string());
        }
        user.is_verified = true;
        Ok(user.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemoryTrialCodeStore {
    codes: Arc<Mutex<HashMap<String, TrialCode>>>,
}

impl MemoryTrialCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, code: &str, used: bool, expires_at: DateTime<Utc>) {
        let mut codes = self.codes.lock().await;
        codes.insert(
            code.to_string(),
            TrialCode {
                code: code.to_string(),
                used,
                expires_at,
            },
        );
    }
}

#[async_trait]
impl TrialCodeStore for MemoryTrialCodeStore {
    async fn find(&self, code: &str) -> Result<Option<TrialCode>, StoreError> {
        Ok(self.codes.lock().await.get(code).cloned())
    }

    async fn consume(&self, code: &str) -> Result<bool, StoreError> {
        let mut codes = self.codes.lock().await;
        match codes.get_mut(code) {
            Some(record) if !record.used => {
                record.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
