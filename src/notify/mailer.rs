//! SMTP notification transport
//!
//! The `Mailer` trait is the seam between the deployer and the outside
//! world; `SmtpMailer` is the production implementation on top of lettre.

use std::env;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Mail delivery error
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid email address: {0}")]
    Address(String),
}

/// Notification delivery seam. One call per recipient; implementations must
/// not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

/// SMTP client settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// 587 (STARTTLS) by default.
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub use_tls: bool,
}

impl SmtpConfig {
    /// Load SMTP settings from `AUTOPULL_SMTP_*` variables. Returns `None`
    /// when no host is configured - the agent then runs without a mailer.
    pub fn from_env() -> Option<Result<Self, MailerError>> {
        let host = env::var("AUTOPULL_SMTP_HOST").ok().filter(|h| !h.is_empty())?;

        let port = match env::var("AUTOPULL_SMTP_PORT") {
            Ok(raw) => match raw.parse() {
                Ok(port) => port,
                Err(_) => {
                    return Some(Err(MailerError::Config(
                        "AUTOPULL_SMTP_PORT must be a valid port number".to_string(),
                    )))
                }
            },
            Err(_) => 587,
        };

        let from_address = match env::var("AUTOPULL_SMTP_FROM") {
            Ok(from) => from,
            Err(_) => {
                return Some(Err(MailerError::Config(
                    "AUTOPULL_SMTP_FROM is required when AUTOPULL_SMTP_HOST is set".to_string(),
                )))
            }
        };

        let username = env::var("AUTOPULL_SMTP_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("AUTOPULL_SMTP_PASSWORD").ok().filter(|s| !s.is_empty());

        let use_tls = env::var("AUTOPULL_SMTP_USE_TLS")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        Some(Ok(Self {
            host,
            port,
            username,
            password,
            from_address,
            use_tls,
        }))
    }
}

impl std::fmt::Debug for SmtpConfig {
    // The password never reaches logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Async SMTP mailer. The connection is made lazily on first send.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, MailerError> {
        let from_mailbox: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| MailerError::Address(format!("{e}")))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailerError::Connection(format!("{e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        tracing::debug!(host = %config.host, port = config.port, "SMTP mailer initialized");

        Ok(Self {
            transport: builder.build(),
            from_mailbox,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        let to_mailbox: Mailbox = to.parse().map_err(|e| MailerError::Address(format!("{e}")))?;

        let message = Message::builder()
            .from(self.from_mailbox.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailerError::Send(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailerError::Send(format!("{e}")))?;

        tracing::info!(%to, %subject, "Notification sent");
        Ok(())
    }
}
