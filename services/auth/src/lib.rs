//! VoyageX authentication service
//!
//! Credential verification, session token issuance, one-time token
//! management for email verification and password reset, and the two-tier
//! admin authorization model (standard admin and time-limited trial admin).

pub mod admin;
pub mod email;
pub mod error;
pub mod jwt;
pub mod models;
pub mod onetime;
pub mod password;
pub mod rate_limiter;
pub mod routes;
pub mod service;
pub mod stores;
pub mod validation;

use std::sync::Arc;

use crate::admin::AdminAuthority;
use crate::jwt::TokenCodec;
use crate::rate_limiter::RateLimiter;
use crate::service::AuthService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub admin: Arc<AdminAuthority>,
    pub codec: TokenCodec,
    pub rate_limiter: RateLimiter,
}
