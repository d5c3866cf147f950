//! Deployment orchestration
//!
//! `Deployer::deploy` is the single entry point: authorize the trigger
//! (networked origins only), run the update script, fire the post-deploy
//! hook, and flush exactly one summary notification whichever way the run
//! ends.

pub mod script;

use std::sync::Arc;

use crate::config::DeployConfig;
use crate::domain::outcome::DeployOutcome;
use crate::domain::request::{Origin, RequestContext};
use crate::error::DeployError;
use crate::notify::{LogKind, LogSink, Mailer, NotificationSink};

pub use script::ScriptRunner;

/// Orchestrates one deployment per `deploy()` call.
///
/// `deploy()` takes `&self`: two concurrent calls against the same target
/// directory are independent, unsynchronized runs. Serializing them is the
/// caller's responsibility.
pub struct Deployer {
    config: DeployConfig,
    mailer: Option<Arc<dyn Mailer>>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl Deployer {
    /// Validates the configuration; an empty target directory is rejected
    /// here, before any deployment can be attempted.
    pub fn new(config: DeployConfig) -> Result<Self, DeployError> {
        config.validate()?;
        Ok(Self {
            config,
            mailer: None,
            log_sink: None,
        })
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(log_sink);
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Run one deployment.
    ///
    /// Every terminal path - rejected, failed, successful - flushes exactly
    /// one notification before this returns or the error propagates.
    pub async fn deploy(&self, request: &RequestContext) -> Result<DeployOutcome, DeployError> {
        let mut sink = NotificationSink::new(
            self.config.notify_emails.clone(),
            self.log_sink.clone(),
            self.config.date_format.clone(),
        );

        sink.record(LogKind::Info, "Attempting deployment...");

        match request.origin() {
            // Direct invocations are always trusted; authorization is
            // skipped entirely.
            Origin::Direct => {
                sink.record(LogKind::Info, "Running from direct invocation");
            }
            Origin::Networked => self.authorize(request, &mut sink).await?,
        }

        let runner = ScriptRunner::from_config(&self.config);
        let (program, args) = runner.command_line(
            &self.config.branch,
            &self.config.directory,
            &self.config.remote,
        );
        sink.record(
            LogKind::Info,
            &format!("{} {}", program, args.join(" ")),
        );

        let outcome = runner
            .run(
                &self.config.branch,
                &self.config.directory,
                &self.config.remote,
            )
            .await;

        if !outcome.success {
            tracing::error!(
                exit_code = ?outcome.exit_code,
                directory = %self.config.directory,
                "Deploy script failed"
            );
            sink.record(
                LogKind::Error,
                &match outcome.exit_code {
                    Some(code) => format!(
                        "Deploy script failed with exit code {}\n{}",
                        code, outcome.output
                    ),
                    None => format!("Deploy script failed to launch\n{}", outcome.output),
                },
            );
            sink.flush("Deployment script failed", self.mailer.as_deref())
                .await;
            return Err(DeployError::Script {
                exit_code: outcome.exit_code,
                output: outcome.output,
            });
        }

        sink.record(
            LogKind::Info,
            &format!("Running deploy script...\n{}", outcome.output),
        );

        // The deployment itself has succeeded; the hook runs exactly once
        // and its failure propagates only after the success notification
        // is flushed.
        let hook_result = match &self.config.post_deploy_hook {
            Some(hook) => hook(),
            None => Ok(()),
        };
        if let Err(error) = &hook_result {
            sink.record(
                LogKind::Error,
                &format!("Post-deploy hook failed: {}", error),
            );
        }

        sink.record(LogKind::Info, "Deployment successful.");
        sink.flush("Deployment successful", self.mailer.as_deref())
            .await;

        tracing::info!(
            branch = %self.config.branch,
            directory = %self.config.directory,
            "Deployment successful"
        );

        hook_result.map_err(|source| DeployError::Hook { source })?;
        Ok(outcome)
    }

    /// Authorize a networked trigger: resolve the caller address, record
    /// the audit trail, check the allow-list. Fails closed when no address
    /// can be resolved. On rejection the script is never invoked and the
    /// failure notification is flushed here.
    async fn authorize(
        &self,
        request: &RequestContext,
        sink: &mut NotificationSink,
    ) -> Result<(), DeployError> {
        let address = request.resolved_address();

        match &address {
            Some(address) => sink.record(LogKind::Info, &format!("IP is {}", address)),
            None => sink.record(LogKind::Info, "Caller address could not be resolved"),
        }

        if !request.headers().is_empty() {
            sink.record(LogKind::Info, &format!("{:#?}", request.headers()));
        }
        if let Some(payload) = request.payload_for_log() {
            sink.record(LogKind::Post, &payload);
        }

        let permitted = address
            .as_deref()
            .map(|address| self.config.allow_list.permits(address))
            .unwrap_or(false);

        if permitted {
            return Ok(());
        }

        let address = address.unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(%address, "Rejected deployment trigger from unauthorised address");
        sink.record(
            LogKind::Error,
            &format!("{} is not an authorised remote address", address),
        );
        sink.flush("Unauthorized deployment attempt", self.mailer.as_deref())
            .await;

        Err(DeployError::Unauthorized { address })
    }
}
