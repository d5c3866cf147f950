//! Logging and notification pipeline
//!
//! Every deployment run gets its own `NotificationSink`: log lines are
//! mirrored to an optional append-only sink as they happen and, when
//! recipients are configured, buffered so the whole transcript can be
//! mailed out in one summary message at the end of the run.

pub mod mailer;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

pub use mailer::{Mailer, MailerError, SmtpConfig, SmtpMailer};

/// Kind tag for a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    /// Captured request payload.
    Post,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Post => "POST",
            LogKind::Error => "ERROR",
        }
    }
}

/// Summary notification composed at the end of a run.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub subject: String,
    /// Concatenation of every transcript line recorded during the run.
    pub body: String,
    /// Snapshot of the recipient list at flush time.
    pub recipients: Vec<String>,
}

/// Pluggable log destination. Absence means logging is a local no-op.
pub trait LogSink: Send + Sync {
    /// Append one line. Failures must be handled internally; a broken log
    /// destination never fails a deployment.
    fn append(&self, line: &str);
}

/// Append-only file sink. Relies on the platform's atomic-append guarantee;
/// no in-process locking.
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append(&self, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", line));

        if let Err(error) = result {
            tracing::warn!(path = %self.path.display(), %error, "Failed to append to log file");
        }
    }
}

/// Per-invocation transcript collector.
///
/// The buffer exists only while recipients are configured; it is drained by
/// exactly one `flush` per deployment, never partially.
pub struct NotificationSink {
    recipients: Vec<String>,
    buffer: Option<Vec<String>>,
    log_sink: Option<Arc<dyn LogSink>>,
    date_format: String,
}

impl NotificationSink {
    pub fn new(
        recipients: Vec<String>,
        log_sink: Option<Arc<dyn LogSink>>,
        date_format: impl Into<String>,
    ) -> Self {
        let buffer = if recipients.is_empty() {
            None
        } else {
            Some(Vec::new())
        };
        Self {
            recipients,
            buffer,
            log_sink,
            date_format: date_format.into(),
        }
    }

    /// Record one transcript line: `[timestamp]\tKIND\tmessage`.
    pub fn record(&mut self, kind: LogKind, message: &str) {
        let line = format!(
            "[{}]\t{}\t{}",
            Utc::now().format(&self.date_format),
            kind.as_str(),
            message
        );

        match kind {
            LogKind::Error => tracing::warn!("{}", message),
            _ => tracing::debug!("{}", message),
        }

        if let Some(sink) = &self.log_sink {
            sink.append(&line);
        }
        if let Some(buffer) = &mut self.buffer {
            buffer.push(line);
        }
    }

    /// Compose the summary message and deliver it to every recipient
    /// independently. Best-effort: one failed delivery never blocks the
    /// others, and nothing is retried. With no recipients configured this
    /// is a no-op.
    pub async fn flush(&mut self, subject: &str, mailer: Option<&dyn Mailer>) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };

        let message = NotificationMessage {
            subject: subject.to_string(),
            body: buffer.join("\n"),
            recipients: self.recipients.clone(),
        };

        let Some(mailer) = mailer else {
            tracing::warn!(
                recipients = self.recipients.len(),
                "Recipients configured but no mailer available, skipping notification"
            );
            return;
        };

        for recipient in &message.recipients {
            if let Err(error) = mailer.send(recipient, &message.subject, &message.body).await {
                tracing::warn!(%recipient, %error, "Failed to deliver notification");
            }
        }
    }
}
