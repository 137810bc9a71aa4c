//! Auth service: registration, login, email verification, password reset,
//! and OAuth upsert
//!
//! Orchestrates the password hasher, one-time token generator, token codec,
//! and user store. Email dispatch is best-effort on a detached task; a
//! delivery failure is logged and never fails the enclosing operation.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::email::{self, Mailer};
use crate::error::AuthError;
use crate::jwt::{Subject, TokenCodec};
use crate::models::{NewUser, UserView};
use crate::onetime::generate_one_time_token;
use crate::password::{hash_password, verify_password};
use crate::stores::{StoreError, UserStore};
use crate::validation::{validate_email, validate_password};

/// Default session validity
const SESSION_TTL_HOURS: i64 = 24;
/// Session validity when remember-me is requested
const REMEMBER_ME_TTL_DAYS: i64 = 30;
/// Email verification token validity
const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
/// Password reset token validity
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// A successful authentication: sanitized user plus bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: UserView,
    pub token: String,
    /// Cookie lifetime in seconds, matching the token validity.
    pub max_age: u64,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    codec: TokenCodec,
    app_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        codec: TokenCodec,
        app_url: String,
    ) -> Self {
        Self {
            users,
            mailer,
            codec,
            app_url,
        }
    }

    /// Register a new account: unverified, with a fresh 24h verification
    /// token, and immediately logged in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        validate_email(email).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        if self
            .users
            .find_by_email(email)
            .await
            .map_err(store_failure)?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;
        let verification_token = generate_one_time_token();
        let verification_expiry = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);

        let user = self
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash: Some(password_hash),
                name: name.map(str::to_string),
                is_verified: false,
                email_verification_token: Some(verification_token.clone()),
                email_verification_expiry: Some(verification_expiry),
                ..NewUser::default()
            })
            .await
            .map_err(|e| match e {
                // Lost a create race after the pre-check; same outcome.
                StoreError::DuplicateEmail => AuthError::DuplicateEmail,
                other => store_failure(other),
            })?;

        info!("Registered user: {}", user.id);

        let (subject, html) = email::verification_email(&self.app_url, &verification_token);
        self.dispatch_email(user.email.clone(), subject, html);

        let token = self.codec.issue(
            Subject::Standard { user_id: user.id },
            Duration::hours(SESSION_TTL_HOURS),
        )?;

        Ok(AuthSession {
            user: UserView::from(&user),
            token,
            max_age: (SESSION_TTL_HOURS * 3600) as u64,
        })
    }

    /// Log in with email and password.
    ///
    /// Unknown email, OAuth-only account (no password hash), and wrong
    /// password all return the identical `InvalidCredentials` error.
    /// Verification status does not gate login; callers that care check
    /// `is_verified` on the returned view.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let validity = if remember_me {
            Duration::days(REMEMBER_ME_TTL_DAYS)
        } else {
            Duration::hours(SESSION_TTL_HOURS)
        };

        if remember_me {
            let remember_token = generate_one_time_token();
            self.users
                .set_remember_me_token(user.id, &remember_token)
                .await
                .map_err(store_failure)?;
        }

        let token = self
            .codec
            .issue(Subject::Standard { user_id: user.id }, validity)?;

        info!("User logged in: {}", user.id);

        Ok(AuthSession {
            user: UserView::from(&user),
            token,
            max_age: validity.num_seconds() as u64,
        })
    }

    /// Consume a verification token, marking the account verified.
    ///
    /// At most one call per token succeeds; the store's conditional update
    /// decides the winner under concurrency.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let consumed = self
            .users
            .consume_verification_token(token, Utc::now())
            .await
            .map_err(store_failure)?;

        if consumed {
            Ok(())
        } else {
            Err(AuthError::InvalidOrExpiredToken)
        }
    }

    /// Start a password reset: store a 1h reset token and email it.
    ///
    /// Returns `UserNotFound` for an unknown email. This mirrors the
    /// product's current behavior and is a known enumeration tradeoff.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::UserNotFound)?;

        let reset_token = generate_one_time_token();
        let expiry = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        self.users
            .set_reset_token(user.id, &reset_token, expiry)
            .await
            .map_err(store_failure)?;

        info!("Password reset requested for user: {}", user.id);

        let (subject, html) = email::password_reset_email(&self.app_url, &reset_token);
        self.dispatch_email(user.email, subject, html);

        Ok(())
    }

    /// Complete a password reset, consuming the token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password).map_err(AuthError::Validation)?;

        let new_hash = hash_password(new_password)?;
        let consumed = self
            .users
            .consume_reset_token(token, &new_hash, Utc::now())
            .await
            .map_err(store_failure)?;

        if consumed {
            Ok(())
        } else {
            Err(AuthError::InvalidOrExpiredToken)
        }
    }

    /// Log in (or sign up) through an OAuth provider.
    ///
    /// Looks up by email first, then by provider pair. New accounts are
    /// created pre-verified with no password hash; existing accounts get
    /// their linkage and profile refreshed and are forced verified.
    pub async fn oauth_upsert(
        &self,
        provider: &str,
        provider_id: &str,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let existing = match self
            .users
            .find_by_email(email)
            .await
            .map_err(store_failure)?
        {
            Some(user) => Some(user),
            None => self
                .users
                .find_by_oauth(provider, provider_id)
                .await
                .map_err(store_failure)?,
        };

        let user = match existing {
            Some(user) => self
                .users
                .link_oauth(user.id, provider, provider_id, name, image)
                .await
                .map_err(store_failure)?,
            None => self
                .users
                .create(NewUser {
                    email: email.to_string(),
                    name: name.map(str::to_string),
                    image: image.map(str::to_string),
                    is_verified: true,
                    oauth_provider: Some(provider.to_string()),
                    oauth_provider_id: Some(provider_id.to_string()),
                    ..NewUser::default()
                })
                .await
                .map_err(|e| match e {
                    StoreError::DuplicateEmail => AuthError::DuplicateEmail,
                    other => store_failure(other),
                })?,
        };

        let token = self.codec.issue(
            Subject::Standard { user_id: user.id },
            Duration::hours(SESSION_TTL_HOURS),
        )?;

        info!("OAuth login for user: {} via {}", user.id, provider);

        Ok(AuthSession {
            user: UserView::from(&user),
            token,
            max_age: (SESSION_TTL_HOURS * 3600) as u64,
        })
    }

    /// Fire-and-forget email dispatch. The HTTP response never waits on the
    /// provider; failures are logged with the recipient for diagnosis.
    fn dispatch_email(&self, to: String, subject: String, html: String) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html) {
                warn!("Failed to send \"{}\" email to {}: {}", subject, to, e);
            }
        });
    }
}

/// Map a storage failure to the generic internal error, logging the cause.
fn store_failure(e: StoreError) -> AuthError {
    tracing::error!("Store operation failed: {}", e);
    AuthError::Internal
}
