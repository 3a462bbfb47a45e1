//! Confirmation-code delivery via SMTP.
//!
//! Configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`EmailConfig::from_env`] returns `None` and the code is logged
//! instead of mailed, which keeps local development and tests working
//! without a mail server.

use crate::error::AppError;

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@reviewhub.local";

/// Configuration for the SMTP delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Delivers a signup confirmation code to the given address.
///
/// Without SMTP configuration the code is written to the log at info level,
/// so the signup flow stays usable end to end.
pub async fn send_confirmation_code(
    config: Option<&EmailConfig>,
    to_email: &str,
    username: &str,
    code: &str,
) -> Result<(), AppError> {
    let Some(config) = config else {
        tracing::info!(%username, %code, "SMTP not configured; confirmation code logged");
        return Ok(());
    };

    use lettre::{
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        message::header::ContentType, transport::smtp::authentication::Credentials,
    };

    let body = format!("Your confirmation code: {}", code);

    let email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| AppError::InternalServerError(format!("bad from address: {e}")))?,
        )
        .to(to_email
            .parse()
            .map_err(|e| AppError::InternalServerError(format!("bad recipient: {e}")))?)
        .subject("Confirmation code")
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let mut transport_builder =
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .port(config.smtp_port);

    if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
        transport_builder =
            transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    let mailer = transport_builder.build();
    mailer
        .send(email)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(to = to_email, %username, "Confirmation code sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        unsafe { std::env::remove_var("SMTP_HOST") };
        assert!(EmailConfig::from_env().is_none());
    }
}
