//! HTTP surface of the auth service

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::admin::AdminRole;
use crate::error::AuthError;
use crate::models::UserView;
use crate::service::AuthSession;

/// Combined register/login request
#[derive(Deserialize)]
pub struct AuthActionRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub action: AuthAction,
}

#[derive(Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Register,
    Login,
}

/// Response for user-facing auth operations
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default, rename = "rememberMe")]
    pub remember_me: bool,
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "twoFactorCode")]
    pub two_factor_code: String,
}

#[derive(Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub role: AdminRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct TrialRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct TrialResponse {
    pub success: bool,
    pub token: String,
    pub expiration: DateTime<Utc>,
}

/// Create the router for the auth service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth", post(auth_entry))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/admin/login", post(admin_login))
        .route("/admin/auth", get(admin_auth))
        .route("/admin/trial", post(admin_trial))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "voyagex-auth"
    }))
}

/// Combined register/login endpoint
pub async fn auth_entry(
    State(state): State<AppState>,
    Json(payload): Json<AuthActionRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let session = match payload.action {
        AuthAction::Register => {
            info!("Register attempt: {}", payload.email);
            state
                .auth
                .register(&payload.email, &payload.password, payload.name.as_deref())
                .await?
        }
        AuthAction::Login => throttled_login(&state, &payload.email, &payload.password, false).await?,
    };

    Ok(Json(AuthResponse {
        success: true,
        user: Some(session.user),
        token: Some(session.token),
    }))
}

/// Login endpoint; sets the session token as an http-only cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let session =
        throttled_login(&state, &payload.email, &payload.password, payload.remember_me).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie("token", &session.token, session.max_age, "Lax")?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            success: true,
            user: Some(session.user),
            token: Some(session.token),
        }),
    ))
}

/// Email verification endpoint
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.token.is_empty() {
        return Err(AuthError::Validation(
            "Verification token is required".to_string(),
        ));
    }

    state.auth.verify_email(&payload.token).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Password reset initiation endpoint
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }

    state.auth.request_password_reset(&payload.email).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Password reset completion endpoint
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.token.is_empty() || payload.new_password.is_empty() {
        return Err(AuthError::Validation(
            "Token and new password are required".to_string(),
        ));
    }

    state
        .auth
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Admin login endpoint; sets the admin token as a strict http-only cookie.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if !state.rate_limiter.check(&payload.username).await {
        return Err(AuthError::RateLimited);
    }

    let session = match state
        .admin
        .admin_login(&payload.username, &payload.password, &payload.two_factor_code)
        .await
    {
        Ok(session) => {
            state.rate_limiter.reset(&payload.username).await;
            session
        }
        Err(err) => {
            if matches!(
                err,
                AuthError::InvalidCredentials | AuthError::InvalidTwoFactorCode
            ) {
                state.rate_limiter.record_failure(&payload.username).await;
            }
            return Err(err);
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie("adminToken", &session.token, session.max_age, "Strict")?,
    );

    Ok((
        headers,
        Json(AdminLoginResponse {
            success: true,
            role: session.role,
            expiration: session.expiration,
        }),
    ))
}

/// Bearer-token check used by the admin dashboard.
///
/// Missing, malformed, expired, and tampered tokens all yield a uniform 401.
pub async fn admin_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<impl IntoResponse, AuthError> {
    let TypedHeader(bearer) = bearer.ok_or(AuthError::Unauthorized)?;

    let claims = state
        .codec
        .verify(bearer.token())
        .map_err(|_| AuthError::Unauthorized)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "claims": claims,
        })),
    ))
}

/// Trial code activation endpoint
pub async fn admin_trial(
    State(state): State<AppState>,
    Json(payload): Json<TrialRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.code.is_empty() {
        return Err(AuthError::Validation("Trial code is required".to_string()));
    }

    let activation = state.admin.activate_trial(&payload.code).await?;

    Ok(Json(TrialResponse {
        success: true,
        token: activation.token,
        expiration: activation.expiration,
    }))
}

/// Gate a login attempt on the brute-force limiter, counting only failed
/// credential checks against the caller's email.
async fn throttled_login(
    state: &AppState,
    email: &str,
    password: &str,
    remember_me: bool,
) -> Result<AuthSession, AuthError> {
    if !state.rate_limiter.check(email).await {
        return Err(AuthError::RateLimited);
    }

    match state.auth.login(email, password, remember_me).await {
        Ok(session) => {
            state.rate_limiter.reset(email).await;
            Ok(session)
        }
        Err(err) => {
            if err == AuthError::InvalidCredentials {
                state.rate_limiter.record_failure(email).await;
            }
            Err(err)
        }
    }
}

fn session_cookie(
    name: &str,
    token: &str,
    max_age: u64,
    same_site: &str,
) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!(
        "{name}={token}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age}"
    ))
    .map_err(|_| AuthError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminAuthority, AdminConfig, DEV_TOTP_SECRET};
    use crate::email::LogMailer;
    use crate::jwt::{JwtConfig, TokenCodec};
    use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
    use crate::service::AuthService;
    use crate::stores::memory::{MemoryTrialCodeStore, MemoryUserStore};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use totp_rs::{Algorithm, Secret, TOTP};
    use tower::util::ServiceExt;

    async fn test_router() -> Router {
        test_router_with(RateLimiterConfig::default()).await
    }

    async fn test_router_with(limiter_config: RateLimiterConfig) -> Router {
        let codec = TokenCodec::new(&JwtConfig {
            secret: "route-test-secret".to_string(),
        });
        let users = Arc::new(MemoryUserStore::new());
        let trial_codes = Arc::new(MemoryTrialCodeStore::new());
        trial_codes
            .insert("VOYAGEX-2024-001", false, Utc::now() + Duration::days(30))
            .await;

        let config = AdminConfig {
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            admin_totp_secret: DEV_TOTP_SECRET.to_string(),
            trial_username: "trial_admin".to_string(),
            trial_password: "trial123".to_string(),
            trial_totp_secret: DEV_TOTP_SECRET.to_string(),
        };

        let state = AppState {
            auth: Arc::new(AuthService::new(
                users,
                Arc::new(LogMailer),
                codec.clone(),
                "http://localhost:3000".to_string(),
            )),
            admin: Arc::new(AdminAuthority::new(&config, codec.clone(), trial_codes).unwrap()),
            codec,
            rate_limiter: RateLimiter::new(limiter_config),
        };

        create_router(state)
    }

    fn current_code() -> String {
        let secret = Secret::Encoded(DEV_TOTP_SECRET.to_string()).to_bytes().unwrap();
        TOTP::new(Algorithm::SHA1, 6, 1, 30, secret, None, "test".to_string())
            .unwrap()
            .generate_current()
            .unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_and_login_round_trip() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/auth",
                serde_json::json!({
                    "email": "alice@example.com",
                    "password": "Secret123!",
                    "name": "Alice",
                    "action": "register"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["is_verified"], false);
        assert!(body["token"].is_string());

        let response = router
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({
                    "email": "alice@example.com",
                    "password": "Secret123!",
                    "rememberMe": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[tokio::test]
    async fn bad_credentials_return_401_with_generic_error() {
        let router = test_router().await;

        let response = router
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({
                    "email": "nobody@example.com",
                    "password": "Whatever1x"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn auth_action_login_is_rate_limited() {
        let router = test_router_with(RateLimiterConfig {
            max_attempts: 2,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        })
        .await;

        let guess = serde_json::json!({
            "email": "mallory@example.com",
            "password": "WrongPass1",
            "action": "login"
        });

        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(post_json("/auth", guess.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = router.oneshot(post_json("/auth", guess)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn successful_logins_are_never_throttled() {
        let router = test_router_with(RateLimiterConfig {
            max_attempts: 2,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        })
        .await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/auth",
                serde_json::json!({
                    "email": "alice@example.com",
                    "password": "Secret123!",
                    "action": "register"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..4 {
            let response = router
                .clone()
                .oneshot(post_json(
                    "/auth/login",
                    serde_json::json!({
                        "email": "alice@example.com",
                        "password": "Secret123!"
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn admin_login_sets_cookie_and_bad_code_does_not() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/admin/login",
                serde_json::json!({
                    "username": "admin",
                    "password": "admin123",
                    "twoFactorCode": current_code()
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("adminToken="));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=3600"));

        let response = router
            .oneshot(post_json(
                "/admin/login",
                serde_json::json!({
                    "username": "admin",
                    "password": "admin123",
                    "twoFactorCode": "000000"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn trial_activation_once_then_already_used() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/admin/trial",
                serde_json::json!({ "code": "VOYAGEX-2024-001" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();

        // Token round-trips through the admin auth check.
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/admin/auth")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["claims"]["role"], "trial_admin");

        let response = router
            .oneshot(post_json(
                "/admin/trial",
                serde_json::json!({ "code": "VOYAGEX-2024-001" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "This trial code has already been used");
    }

    #[tokio::test]
    async fn admin_auth_without_token_is_401() {
        let router = test_router().await;

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/admin/auth")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
