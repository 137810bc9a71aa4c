//! Admin authority: fixed-credential login with TOTP 2FA, and single-use
//! trial code activation
//!
//! No persistent admin record exists; the two credential sets (standard and
//! trial) come from configuration. Passwords are hashed once at startup and
//! verified per request, never re-hashed and compared. Trial codes live in
//! the credential store and are consumed with a compare-and-set.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::info;

use crate::error::AuthError;
use crate::jwt::{Subject, TokenCodec};
use crate::password::{hash_password, verify_password};
use crate::stores::TrialCodeStore;

/// Standard admin session validity
const ADMIN_TTL_HOURS: i64 = 1;
/// Trial admin session validity
const TRIAL_TTL_DAYS: i64 = 7;

/// Admin credential configuration
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub admin_totp_secret: String,
    pub trial_username: String,
    pub trial_password: String,
    pub trial_totp_secret: String,
}

impl AdminConfig {
    /// Create a new AdminConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ADMIN_USERNAME` (default: "admin")
    /// - `ADMIN_PASSWORD` (default: "admin123", dev only)
    /// - `ADMIN_2FA_SECRET`: base32 TOTP secret, at least 16 decoded bytes
    /// - `TRIAL_ADMIN_USERNAME` (default: "trial_admin")
    /// - `TRIAL_ADMIN_PASSWORD` (default: "trial123", dev only)
    /// - `TRIAL_ADMIN_2FA_SECRET`: base32 TOTP secret
    pub fn from_env() -> Self {
        let env_or = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        AdminConfig {
            admin_username: env_or("ADMIN_USERNAME", "admin"),
            admin_password: env_or("ADMIN_PASSWORD", "admin123"),
            admin_totp_secret: env_or("ADMIN_2FA_SECRET", DEV_TOTP_SECRET),
            trial_username: env_or("TRIAL_ADMIN_USERNAME", "trial_admin"),
            trial_password: env_or("TRIAL_ADMIN_PASSWORD", "trial123"),
            trial_totp_secret: env_or("TRIAL_ADMIN_2FA_SECRET", DEV_TOTP_SECRET),
        }
    }
}

/// Dev-only fallback secret; decodes to 20 bytes of base32.
pub(crate) const DEV_TOTP_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

/// Admin role tag carried in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    TrialAdmin,
}

/// A successful admin login
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub token: String,
    pub role: AdminRole,
    /// Explicit expiration, present only for trial admins.
    pub expiration: Option<DateTime<Utc>>,
    /// Cookie lifetime in seconds.
    pub max_age: u64,
}

/// A successful trial code activation
#[derive(Debug, Clone, PartialEq)]
pub struct TrialActivation {
    pub token: String,
    pub expiration: DateTime<Utc>,
}

struct CredentialSet {
    username: String,
    password_hash: String,
    totp: TOTP,
}

impl CredentialSet {
    fn new(username: String, password: &str, totp_secret: &str) -> Result<Self> {
        // Hash once at startup; login verifies against this digest instead
        // of re-hashing the configured password per request.
        let password_hash = hash_password(password)
            .map_err(|_| anyhow::anyhow!("failed to hash configured password"))?;

        let secret_bytes = Secret::Encoded(totp_secret.to_string())
            .to_bytes()
            .map_err(|e| anyhow::anyhow!("invalid base32 TOTP secret: {:?}", e))?;
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1, // skew: accept the previous and next time step
            30,
            secret_bytes,
            Some("VoyageX".to_string()),
            username.clone(),
        )
        .context("failed to build TOTP for admin credential set")?;

        Ok(Self {
            username,
            password_hash,
            totp,
        })
    }
}

pub struct AdminAuthority {
    codec: TokenCodec,
    trial_codes: Arc<dyn TrialCodeStore>,
    admin: CredentialSet,
    trial: CredentialSet,
}

impl AdminAuthority {
    pub fn new(
        config: &AdminConfig,
        codec: TokenCodec,
        trial_codes: Arc<dyn TrialCodeStore>,
    ) -> Result<Self> {
        Ok(Self {
            codec,
            trial_codes,
            admin: CredentialSet::new(
                config.admin_username.clone(),
                &config.admin_password,
                &config.admin_totp_secret,
            )?,
            trial: CredentialSet::new(
                config.trial_username.clone(),
                &config.trial_password,
                &config.trial_totp_secret,
            )?,
        })
    }

    /// Authenticate an admin with username, password, and a TOTP code.
    ///
    /// The credential set is selected by username: the trial identity gets
    /// trial credentials and a 7-day token with an explicit expiration,
    /// everything else is checked against the standard set for a 1-hour
    /// token.
    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
        two_factor_code: &str,
    ) -> Result<AdminSession, AuthError> {
        let is_trial = username == self.trial.username;
        let set = if is_trial { &self.trial } else { &self.admin };

        if username != set.username || !verify_password(password, &set.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        if !set.totp.check_current(two_factor_code).unwrap_or(false) {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        info!("Admin login: {}", username);

        if is_trial {
            let expiration = Utc::now() + Duration::days(TRIAL_TTL_DAYS);
            let token = self.codec.issue(
                Subject::TrialAdmin {
                    username: Some(username.to_string()),
                    code: None,
                    expiration,
                },
                Duration::days(TRIAL_TTL_DAYS),
            )?;
            Ok(AdminSession {
                token,
                role: AdminRole::TrialAdmin,
                expiration: Some(expiration),
                max_age: (TRIAL_TTL_DAYS * 24 * 3600) as u64,
            })
        } else {
            let token = self.codec.issue(
                Subject::Admin {
                    username: username.to_string(),
                },
                Duration::hours(ADMIN_TTL_HOURS),
            )?;
            Ok(AdminSession {
                token,
                role: AdminRole::Admin,
                expiration: None,
                max_age: (ADMIN_TTL_HOURS * 3600) as u64,
            })
        }
    }

    /// Consume a single-use trial code and issue a trial admin token bound
    /// to the code's configured expiry.
    pub async fn activate_trial(&self, code: &str) -> Result<TrialActivation, AuthError> {
        let record = self
            .trial_codes
            .find(code)
            .await
            .map_err(|e| {
                tracing::error!("Trial code lookup failed: {}", e);
                AuthError::Internal
            })?
            .ok_or(AuthError::InvalidCode)?;

        if record.used {
            return Err(AuthError::AlreadyUsed);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::Expired);
        }

        // CAS on the used flag; a concurrent activation that lost the race
        // lands here with the flag already flipped.
        let won = self.trial_codes.consume(code).await.map_err(|e| {
            tracing::error!("Trial code consume failed: {}", e);
            AuthError::Internal
        })?;
        if !won {
            return Err(AuthError::AlreadyUsed);
        }

        info!("Trial code activated: {}", code);

        let token = self.codec.issue(
            Subject::TrialAdmin {
                username: None,
                code: Some(code.to_string()),
                expiration: record.expires_at,
            },
            Duration::days(TRIAL_TTL_DAYS),
        )?;

        Ok(TrialActivation {
            token,
            expiration: record.expires_at,
        })
    }
}
