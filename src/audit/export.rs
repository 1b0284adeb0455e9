//! Export job submission and polling.
//!
//! An export is asynchronous on the console side: [`ExportJobClient::submit`]
//! creates a job from an [`ExportFilter`], then
//! [`ExportJobClient::wait_for_completion`] polls it at a fixed interval until
//! it succeeds with a download location, fails remotely, the wall-clock budget
//! runs out, or the caller cancels.

use crate::audit::resolver::ServiceResolution;
use crate::console_api::ConsoleClient;
use crate::error::{PipelineError, Result};
use crate::utils::progress::ProgressReporter;
use crate::utils::validate::{string_param, uuid_param};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EXPORTS_PATH: &str = "/v1/audit-log-exports";

/// Remote job lifecycle state.
///
/// `TimedOut` is never sent by the console; it marks a job the client gave up
/// waiting for. Unrecognized values map to `Unknown` and are polled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    Active,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
    #[default]
    Unknown,
}

impl ExportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::TimedOut => "TIMED_OUT",
            Self::Unknown => "UNKNOWN",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    /// No further polling will change this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExportState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExportState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unknown, Self::parse))
    }
}

/// Local copy of a remote export job. Each poll replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub state: ExportState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExportJob {
    /// Download location, if the console reported a usable one.
    pub fn download_location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// Query sent to the export endpoint.
///
/// `source` and `resource_id` are mutually exclusive scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilter {
    from: String,
    to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl ExportFilter {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            tenant_id: None,
            source: None,
            resource_id: None,
            actor_id: None,
            action: None,
            status: None,
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: Option<impl Into<String>>) -> Self {
        self.tenant_id = tenant_id.map(Into::into);
        self
    }

    pub fn with_source(mut self, source: Option<impl Into<String>>) -> Self {
        self.source = source.map(Into::into);
        self
    }

    pub fn with_resource_id(mut self, resource_id: Option<impl Into<String>>) -> Self {
        self.resource_id = resource_id.map(Into::into);
        self
    }

    pub fn with_actor_id(mut self, actor_id: Option<impl Into<String>>) -> Self {
        self.actor_id = actor_id.map(Into::into);
        self
    }

    pub fn with_action(mut self, action: Option<impl Into<String>>) -> Self {
        self.action = action.map(Into::into);
        self
    }

    pub fn with_status(mut self, status: Option<impl Into<String>>) -> Self {
        self.status = status.map(Into::into);
        self
    }

    /// Scope to a resolved service: its source when it has one, otherwise
    /// its resource id.
    pub fn with_service(self, service: &ServiceResolution) -> Self {
        match &service.source {
            Some(source) => self.with_source(Some(source.clone())).with_resource_id(None::<String>),
            None => self
                .with_source(None::<String>)
                .with_resource_id(Some(service.resource_id.clone())),
        }
    }

    /// Trim every field and enforce length and format rules.
    pub fn validate(self) -> Result<Self> {
        let optional = |value: Option<String>, name: &str| -> Result<Option<String>> {
            value.map(|v| string_param(&v, name, 1, 100)).transpose()
        };

        let filter = Self {
            from: string_param(&self.from, "Start Date", 20, 30)?,
            to: string_param(&self.to, "End Date", 20, 30)?,
            tenant_id: self
                .tenant_id
                .map(|t| uuid_param(&t, "tenant_id"))
                .transpose()?,
            source: optional(self.source, "Source")?,
            resource_id: optional(self.resource_id, "Resource ID")?,
            actor_id: optional(self.actor_id, "Actor ID")?,
            action: optional(self.action, "Action")?,
            status: optional(self.status, "Status")?,
        };

        if filter.source.is_some() && filter.resource_id.is_some() {
            return Err(PipelineError::validation(
                "source and resourceId cannot both be set on an export filter",
            ));
        }
        Ok(filter)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// Poll cadence and wall-clock budget for one export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Submits export jobs and polls them to completion
pub struct ExportJobClient<'a> {
    client: &'a ConsoleClient,
    settings: PollSettings,
}

impl<'a> ExportJobClient<'a> {
    pub fn new(client: &'a ConsoleClient, settings: PollSettings) -> Self {
        Self { client, settings }
    }

    /// Create an export job. The reply must carry a job id.
    pub async fn submit(&self, filter: &ExportFilter) -> Result<ExportJob> {
        let job: ExportJob = self.client.post_json(EXPORTS_PATH, filter).await?;
        if job.job_id.trim().is_empty() {
            return Err(PipelineError::Transport(
                "Export job was created but the response contained no jobId".into(),
            ));
        }
        info!(job_id = %job.job_id, state = %job.state, "export job created");
        Ok(job)
    }

    /// Fetch the current state of a job.
    pub async fn fetch(&self, job_id: &str) -> Result<ExportJob> {
        self.client
            .get_json(&format!("{}/{}", EXPORTS_PATH, job_id), &[])
            .await
    }

    /// Poll until the job succeeds with a location, fails, times out, or is
    /// cancelled. `job` is replaced with each poll response.
    ///
    /// Poll errors and non-success statuses are logged and retried; only the
    /// wall-clock budget ends the loop for them. A `SUCCEEDED` job without a
    /// location is polled again.
    pub async fn wait_for_completion(
        &self,
        job: &mut ExportJob,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let job_id = job.job_id.clone();
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.settings.max_wait {
                warn!(%job_id, attempts = attempt, "gave up waiting for export job");
                job.state = ExportState::TimedOut;
                return Err(PipelineError::Timeout {
                    job_id,
                    waited: elapsed,
                });
            }

            attempt += 1;
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                polled = self.fetch(&job_id) => polled,
            };

            match polled {
                Ok(current) => {
                    *job = current;
                    match job.state {
                        ExportState::Succeeded => match job.download_location() {
                            Some(location) => {
                                info!(%job_id, attempts = attempt, "export job succeeded");
                                return Ok(location.to_string());
                            }
                            None => warn!(
                                %job_id,
                                "export job succeeded without a download location, polling again"
                            ),
                        },
                        ExportState::Failed | ExportState::Cancelled => {
                            let reason = job
                                .message
                                .clone()
                                .filter(|m| !m.is_empty())
                                .unwrap_or_else(|| "no reason reported".to_string());
                            return Err(PipelineError::RemoteJob {
                                job_id,
                                state: job.state,
                                reason,
                            });
                        }
                        state => {
                            debug!(%job_id, %state, attempt, "export job still running");
                            progress.report(
                                65,
                                &format!("Export job status: {}, waiting...", state),
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(%job_id, attempt, error = %e, "could not determine export job state");
                }
            }

            let remaining = self.settings.max_wait.saturating_sub(started.elapsed());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(self.settings.interval.min(remaining)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "2025-04-01T00:00:00Z";
    const TO: &str = "2025-04-07T23:59:59Z";

    #[test]
    fn test_state_parsing() {
        let job: ExportJob =
            serde_json::from_str(r#"{"jobId":"j1","state":"SUCCEEDED","location":"https://x"}"#)
                .unwrap();
        assert_eq!(job.state, ExportState::Succeeded);
        assert_eq!(job.download_location(), Some("https://x"));

        let job: ExportJob = serde_json::from_str(r#"{"jobId":"j1","state":"QUEUED"}"#).unwrap();
        assert_eq!(job.state, ExportState::Unknown);
        assert!(!job.state.is_terminal());

        let job: ExportJob = serde_json::from_str(r#"{"jobId":"j1","state":null}"#).unwrap();
        assert_eq!(job.state, ExportState::Unknown);
    }

    #[test]
    fn test_timed_out_is_local_only() {
        let job: ExportJob =
            serde_json::from_str(r#"{"jobId":"j1","state":"TIMED_OUT"}"#).unwrap();
        assert_eq!(job.state, ExportState::Unknown);
        assert!(ExportState::TimedOut.is_terminal());
        assert_eq!(
            serde_json::to_string(&ExportState::TimedOut).unwrap(),
            "\"TIMED_OUT\""
        );
    }

    #[test]
    fn test_blank_location_is_unusable() {
        let job = ExportJob {
            state: ExportState::Succeeded,
            location: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(job.download_location(), None);
    }

    #[test]
    fn test_filter_serializes_camel_case_and_skips_absent() {
        let filter = ExportFilter::new(FROM, TO)
            .with_resource_id(Some("7f1e9b6a-2e4c-4c9e-8d37-5c5b2a0f8e11"))
            .with_status(Some("failure"));
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["from"], FROM);
        assert_eq!(json["resourceId"], "7f1e9b6a-2e4c-4c9e-8d37-5c5b2a0f8e11");
        assert_eq!(json["status"], "failure");
        assert!(json.get("source").is_none());
        assert!(json.get("tenantId").is_none());
    }

    #[test]
    fn test_with_service_prefers_source() {
        let with_source = ServiceResolution {
            resource_id: "rid".into(),
            source: Some("cdsp".into()),
        };
        let filter = ExportFilter::new(FROM, TO).with_service(&with_source);
        assert_eq!(filter.source(), Some("cdsp"));
        assert_eq!(filter.resource_id(), None);

        let without_source = ServiceResolution {
            resource_id: "rid".into(),
            source: None,
        };
        let filter = ExportFilter::new(FROM, TO).with_service(&without_source);
        assert_eq!(filter.source(), None);
        assert_eq!(filter.resource_id(), Some("rid"));
    }

    #[test]
    fn test_validate_trims_and_checks() {
        let filter = ExportFilter::new(FROM, TO)
            .with_action(Some("  LUNA_SIGN "))
            .validate()
            .unwrap();
        assert_eq!(filter.action(), Some("LUNA_SIGN"));

        let err = ExportFilter::new("2025-04-01", TO).validate().unwrap_err();
        assert!(err.is_validation());

        let err = ExportFilter::new(FROM, TO)
            .with_tenant_id(Some("tenant-a"))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("tenant_id"));

        let err = ExportFilter::new(FROM, TO)
            .with_source(Some("cdsp"))
            .with_resource_id(Some("rid"))
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_default_poll_settings() {
        let settings = PollSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.max_wait, Duration::from_secs(300));
    }
}
