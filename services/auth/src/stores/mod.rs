//! Credential store abstractions
//!
//! The auth service and admin authority talk to storage through these
//! traits. Production uses the sqlx-backed Postgres stores; tests use the
//! in-memory doubles in the `memory` module.

pub mod trial;
pub mod user;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, TrialCode, User};

pub use trial::PgTrialCodeStore;
pub use user::PgUserStore;

/// Storage-layer failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint on email hit during create
    #[error("email already exists")]
    DuplicateEmail,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// User-record store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; fails with `DuplicateEmail` on a taken email.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_oauth(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn set_remember_me_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically mark the matching user verified and clear both
    /// verification fields. Returns true iff a row with this unconsumed,
    /// unexpired token existed. Conditional update, not read-then-write, so
    /// two concurrent calls yield exactly one true.
    async fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Atomically commit a new password hash and clear both reset fields.
    /// Same rows-affected discipline as `consume_verification_token`.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Refresh provider linkage and profile fields, forcing verified.
    async fn link_oauth(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<User, StoreError>;
}

/// Trial activation code store
#[async_trait]
pub trait TrialCodeStore: Send + Sync {
    async fn find(&self, code: &str) -> Result<Option<TrialCode>, StoreError>;

    /// Compare-and-set the used flag from false to true. Returns true iff
    /// this call won the flip; a concurrent loser sees false.
    async fn consume(&self, code: &str) -> Result<bool, StoreError>;
}
