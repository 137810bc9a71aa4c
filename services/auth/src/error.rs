//! Auth error taxonomy and its HTTP mapping
//!
//! Every failure category maps to one stable, generic message. Credential and
//! token failures are deliberately unified so a caller cannot tell which
//! check failed; trial-code failures are distinguished because codes are not
//! secrets tied to an account identity.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("User already exists")]
    DuplicateEmail,

    /// Covers unknown email, missing password hash, and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Covers missing, wrong, and time-expired one-time tokens, and any
    /// structural, signature, or expiry failure of a bearer token.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid 2FA code")]
    InvalidTwoFactorCode,

    #[error("Invalid trial code")]
    InvalidCode,

    #[error("This trial code has already been used")]
    AlreadyUsed,

    #[error("This trial code has expired")]
    Expired,

    #[error("{0}")]
    Validation(String),

    #[error("Too many attempts, please try again later")]
    RateLimited,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::DuplicateEmail
            | AuthError::InvalidOrExpiredToken
            | AuthError::UserNotFound
            | AuthError::InvalidCode
            | AuthError::AlreadyUsed
            | AuthError::Expired
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::InvalidTwoFactorCode
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
