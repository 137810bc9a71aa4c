//! Email delivery abstraction
//!
//! The auth service depends only on the [`Mailer`] capability; provider
//! wiring (SMTP, transactional API) stays outside the core. The default
//! sender for local dev is [`LogMailer`], which logs and returns `Ok(())`.

use anyhow::Result;
use tracing::info;

/// Email delivery capability.
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error so the caller can log it.
    fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Local dev sender that logs the envelope instead of sending real email.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        info!(to = %to, subject = %subject, "email send stub");
        Ok(())
    }
}

/// Mail-related configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Public base URL used in verification/reset links
    pub app_url: String,
}

impl MailConfig {
    /// Create a new MailConfig from environment variables
    ///
    /// # Environment Variables
    /// - `APP_URL`: Public base URL (default: "http://localhost:3000")
    pub fn from_env() -> Self {
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        MailConfig { app_url }
    }
}

/// Build the subject and body of the email-verification message.
pub fn verification_email(app_url: &str, token: &str) -> (String, String) {
    let verification_url = format!("{}/verify-email?token={}", app_url, token);
    let subject = "Verify your email address".to_string();
    let html = format!(
        "<h1>Welcome to VoyageX!</h1>\
         <p>Please verify your email address by clicking the link below:</p>\
         <p><a href=\"{url}\">Verify Email</a></p>\
         <p>Or copy and paste this link in your browser:</p>\
         <p>{url}</p>\
         <p>This link will expire in 24 hours.</p>",
        url = verification_url
    );
    (subject, html)
}

/// Build the subject and body of the password-reset message.
pub fn password_reset_email(app_url: &str, token: &str) -> (String, String) {
    let reset_url = format!("{}/reset-password?token={}", app_url, token);
    let subject = "Reset your password".to_string();
    let html = format!(
        "<h1>Password reset requested</h1>\
         <p>Click the link below to choose a new password:</p>\
         <p><a href=\"{url}\">Reset Password</a></p>\
         <p>If you did not request this, you can ignore this email.</p>\
         <p>This link will expire in 1 hour.</p>",
        url = reset_url
    );
    (subject, html)
}
