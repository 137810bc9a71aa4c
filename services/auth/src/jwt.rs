//! Bearer token issuance and verification
//!
//! Tokens are JWTs signed with HS256 over a process-wide secret. Claims are a
//! closed tagged structure keyed on `role`, so callers switch exhaustively on
//! the subject kind instead of poking at an open map. Verification collapses
//! every failure (bad signature, malformed payload, past expiry) into one
//! uniform error.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::error::AuthError;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Shared signing secret (required)
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
        Ok(JwtConfig { secret })
    }
}

/// Identity claim carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Subject {
    /// A regular user session
    Standard { user_id: Uuid },
    /// A standard admin session
    Admin { username: String },
    /// A time-limited trial admin session, from either a trial-admin login
    /// (`username` set) or a trial-code activation (`code` set). The explicit
    /// expiration rides along so the dashboard can show time remaining.
    TrialAdmin {
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        expiration: DateTime<Utc>,
    },
}

/// Full claim set of a session token
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub subject: Subject,
    /// Issued at time (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        // Strict expiry boundary, no grace period.
        validation.leeway = 0;

        TokenCodec {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issue a token for `subject`, expiring `validity` from now.
    pub fn issue(&self, subject: Subject, validity: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, validity, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: Subject,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            subject,
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign session token: {}", e);
            AuthError::Internal
        })
    }

    /// Verify signature and expiry, returning the typed subject.
    ///
    /// Expired, tampered, and malformed tokens are indistinguishable to the
    /// caller; all come back as `InvalidOrExpiredToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidOrExpiredToken)
    }
}
