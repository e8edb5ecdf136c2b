//! rollgate-notify — terminal-job notifications.
//!
//! Invoked exactly once per terminal job. Delivery is fire-and-forget: no
//! retries, and a channel failure is logged but never surfaces to the
//! caller; notification problems must not be able to change a job's
//! outcome.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use rollgate_store::{JobRecord, JobStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Notification channel configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotifyConfig {
    /// URL to POST the terminal job record to, as JSON.
    pub webhook_url: Option<String>,
    pub pushover: Option<PushoverConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushoverConfig {
    pub user_key: String,
    pub app_token: String,
}

/// Dispatches terminal-job notifications over the configured channels.
pub struct Notifier {
    config: NotifyConfig,
    client: reqwest::Client,
    pushover_url: String,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            pushover_url: PUSHOVER_API_URL.to_string(),
        }
    }

    /// Notifier with no channels; every notify is a no-op.
    pub fn disabled() -> Self {
        Self::new(NotifyConfig::default())
    }

    /// Point the Pushover channel at a different endpoint (tests).
    pub fn with_pushover_url(mut self, url: impl Into<String>) -> Self {
        self.pushover_url = url.into();
        self
    }

    /// Deliver a terminal job's outcome on every configured channel.
    ///
    /// Never returns an error; per-channel failures are logged and dropped.
    pub async fn notify(&self, job: &JobRecord, log_path: &Path) {
        if self.config.webhook_url.is_none() && self.config.pushover.is_none() {
            debug!(job = %job.id, "no notification channels configured");
            return;
        }

        let (title, message) = render(job, log_path);

        if let Some(url) = &self.config.webhook_url {
            if let Err(e) = self.send_webhook(url, job).await {
                warn!(job = %job.id, error = %e, "webhook notification failed");
            }
        }

        if let Some(pushover) = &self.config.pushover {
            if let Err(e) = self.send_pushover(pushover, &title, &message).await {
                warn!(job = %job.id, error = %e, "pushover notification failed");
            }
        }
    }

    async fn send_webhook(&self, url: &str, job: &JobRecord) -> Result<(), reqwest::Error> {
        self.client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .json(job)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_pushover(
        &self,
        pushover: &PushoverConfig,
        title: &str,
        message: &str,
    ) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.pushover_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({
                "token": &pushover.app_token,
                "user": &pushover.user_key,
                "title": title,
                "message": message,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn render(job: &JobRecord, log_path: &Path) -> (String, String) {
    let title = match job.status {
        JobStatus::Success => format!("Deployed {}", job.app),
        _ => format!("Deployment failed: {}", job.app),
    };
    let status = match job.status {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Success => "success",
        JobStatus::Failed => "failed",
    };
    let mut message = format!("Image: {}\nStatus: {status}", job.image_ref);
    if let Some(error) = &job.error {
        message.push_str(&format!("\nError: {error}"));
    }
    message.push_str(&format!("\nLog: {}", log_path.display()));
    (title, message)
}
