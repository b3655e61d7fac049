//! Email service for verification links and password resets.
//!
//! Uses SMTP via lettre. Dispatch is a side-channel: callers decide whether a
//! failed send is fatal to their operation, and no send ever rolls back state
//! that was already persisted.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send an email verification link.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        verification_url: &str,
    ) -> Result<(), EmailError> {
        let text = format!(
            "Hi {name},\n\n\
             Thank you for joining HarvestHub! To complete your registration, \
             verify your email address by opening this link:\n\n\
             {verification_url}\n\n\
             The link expires in 24 hours. If you didn't create a HarvestHub \
             account, you can ignore this email.\n\n\
             The HarvestHub Team"
        );
        let html = format!(
            "<p>Hi {name},</p>\
             <p>Thank you for joining HarvestHub! To complete your registration, \
             verify your email address:</p>\
             <p><a href=\"{verification_url}\">Verify Email Address</a></p>\
             <p>The link expires in 24 hours. If you didn't create a HarvestHub \
             account, you can ignore this email.</p>\
             <p>The HarvestHub Team</p>"
        );

        self.send_multipart_email(to, "Welcome to HarvestHub - Verify Your Email", &text, &html)
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_reset_email(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let text = format!(
            "Hi {name},\n\n\
             We received a request to reset the password for your HarvestHub \
             account. If you made this request, open this link:\n\n\
             {reset_url}\n\n\
             The link expires in 30 minutes. If you didn't request a reset, \
             you can ignore this email.\n\n\
             The HarvestHub Team"
        );
        let html = format!(
            "<p>Hi {name},</p>\
             <p>We received a request to reset the password for your HarvestHub \
             account. If you made this request:</p>\
             <p><a href=\"{reset_url}\">Reset Password</a></p>\
             <p>The link expires in 30 minutes. If you didn't request a reset, \
             you can ignore this email.</p>\
             <p>The HarvestHub Team</p>"
        );

        self.send_multipart_email(to, "HarvestHub - Password Reset Request", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
