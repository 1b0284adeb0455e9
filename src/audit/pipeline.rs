//! End-to-end "retrieve and analyze audit logs" operation.
//!
//! Sequences the stages of one run:
//!
//! 1. Normalize dates and validate the filter (no network yet)
//! 2. Resolve the service scope and actor, if a service was named
//! 3. Submit the export job and poll it to completion
//! 4. Stream the artifact to a temp file and decompress it
//! 5. Analyze the records and render the text summary
//!
//! The temp file is removed whether or not analysis succeeds. Validation
//! problems come back as `Err`; every other failure is reported inside
//! [`LogsResponse::Failure`].

use crate::audit::analyzer::{analyze_file, AnalysisSummary};
use crate::audit::download::download_export;
use crate::audit::export::{ExportFilter, ExportJob, ExportJobClient, PollSettings};
use crate::audit::narrative::format_summary;
use crate::audit::resolver::{IdentifierResolver, DATA_PLATFORM_SOURCE, HSM_SOURCE_PREFIX};
use crate::console_api::ConsoleClient;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::utils::progress::ProgressReporter;
use crate::utils::time::{default_window, normalize_date};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Caller-supplied request. All fields are optional; see [`plan_request`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub tenant_id: Option<String>,
    pub service_name: Option<String>,
    pub resource_id: Option<String>,
    pub source_filter: Option<String>,
    pub actor_id: Option<String>,
    pub action_filter: Option<String>,
    pub status_filter: Option<String>,
}

/// Runtime knobs for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub poll: PollSettings,
    /// Where the export is staged; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

/// How the export is scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// All sources the credentials can see.
    Unscoped,
    /// A raw source token, sent as-is.
    Source(String),
    /// A service name or id, resolved before submission.
    Service(String),
}

/// Validated request, ready to execute.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub filter: ExportFilter,
    pub scope: Scope,
}

fn is_raw_source(value: &str) -> bool {
    value.eq_ignore_ascii_case(DATA_PLATFORM_SOURCE) || value.starts_with(HSM_SOURCE_PREFIX)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Normalize and validate a request without touching the network.
///
/// Missing dates default to the last seven days. At most one of
/// `service_name`, `resource_id` and `source_filter` may be set; a
/// `source_filter` that is not a raw source token is treated as a service.
pub fn plan_request(request: &LogsRequest) -> Result<RequestPlan> {
    let scopes = [
        non_empty(&request.service_name),
        non_empty(&request.resource_id),
        non_empty(&request.source_filter),
    ];
    if scopes.iter().flatten().count() > 1 {
        return Err(PipelineError::validation(
            "Specify at most one of service_name, resource_id or source_filter",
        ));
    }

    let scope = match scopes {
        [Some(service), _, _] | [_, Some(service), _] => Scope::Service(service.to_string()),
        [_, _, Some(source)] if is_raw_source(source) => Scope::Source(source.to_string()),
        [_, _, Some(service)] => Scope::Service(service.to_string()),
        _ => Scope::Unscoped,
    };

    let (from, to) = match (non_empty(&request.start_date), non_empty(&request.end_date)) {
        (Some(start), Some(end)) => (normalize_date(start, true), normalize_date(end, false)),
        _ => default_window(Utc::now()),
    };

    let source = match &scope {
        Scope::Source(source) => Some(source.clone()),
        _ => None,
    };

    let filter = ExportFilter::new(from, to)
        .with_tenant_id(non_empty(&request.tenant_id))
        .with_source(source)
        .with_actor_id(non_empty(&request.actor_id))
        .with_action(non_empty(&request.action_filter))
        .with_status(non_empty(&request.status_filter))
        .validate()?;

    Ok(RequestPlan { filter, scope })
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub export_job: ExportJob,
    pub analysis: AnalysisSummary,
    pub formatted_summary: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_job: Option<ExportJob>,
}

/// Result of one run, serialized as `{success: true, ...}` or
/// `{success: false, error, kind}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LogsResponse {
    Success(Box<SuccessResponse>),
    Failure(FailureResponse),
}

impl LogsResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    fn failure(error: &PipelineError, export_job: Option<ExportJob>) -> Self {
        Self::Failure(FailureResponse {
            success: false,
            error: error.to_string(),
            kind: error.kind(),
            export_job,
        })
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = fut => result,
    }
}

/// Runs the retrieval pipeline against one console
pub struct AuditLogPipeline<'a> {
    client: &'a ConsoleClient,
    settings: PipelineSettings,
}

impl<'a> AuditLogPipeline<'a> {
    pub fn new(client: &'a ConsoleClient, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    /// Retrieve and analyze audit logs for `request`.
    pub async fn retrieve_and_analyze(
        &self,
        request: &LogsRequest,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<LogsResponse> {
        let plan = plan_request(request)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("audit_logs", run = %run_id);

        let mut job = None;
        let outcome = self
            .execute(plan, progress, cancel, &mut job)
            .instrument(span.clone())
            .await;

        Ok(match outcome {
            Ok(response) => LogsResponse::Success(Box::new(response)),
            Err(e) => {
                span.in_scope(|| warn!(kind = ?e.kind(), error = %e, "audit log retrieval failed"));
                LogsResponse::failure(&e, job)
            }
        })
    }

    async fn execute(
        &self,
        plan: RequestPlan,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
        job_slot: &mut Option<ExportJob>,
    ) -> Result<SuccessResponse> {
        let RequestPlan { mut filter, scope } = plan;
        let mut warnings = Vec::new();

        progress.report(10, "Starting audit log retrieval");
        progress.report(
            20,
            &format!("Using date range: {} to {}", filter.from(), filter.to()),
        );

        match &scope {
            Scope::Service(identifier) => {
                progress.report(30, &format!("Detecting service details for: {}", identifier));
                let resolver = IdentifierResolver::new(self.client);
                let service =
                    cancellable(cancel, resolver.resolve_service_details(identifier)).await?;
                let resolution = service.resolution();
                progress.report(
                    35,
                    &format!(
                        "Service detected: source={}, resource_id={}",
                        resolution.source.as_deref().unwrap_or("-"),
                        resolution.resource_id
                    ),
                );
                filter = filter.with_service(&resolution);

                if let Some(actor) = filter.actor_id().map(str::to_string) {
                    let resolved = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                        resolved = resolver.resolve_actor_for(&service, &actor) => resolved,
                    };
                    if let Some(warning) = &resolved.warning {
                        warn!(actor = %actor, "{}", warning);
                    }
                    warnings.extend(resolved.warning);
                    filter = filter.with_actor_id(Some(resolved.actor_id));
                }
                filter = filter.validate()?;
            }
            Scope::Source(source) => {
                progress.report(30, &format!("Using source filter: {}", source));
            }
            Scope::Unscoped => {}
        }

        progress.report(40, "Generating audit log export");
        let jobs = ExportJobClient::new(self.client, self.settings.poll);
        let submitted = cancellable(cancel, jobs.submit(&filter)).await?;
        progress.report(50, &format!("Export job created: {}", submitted.job_id));
        let job = job_slot.insert(submitted);

        progress.report(60, "Waiting for export completion");
        let location = jobs.wait_for_completion(job, progress, cancel).await?;

        progress.report(70, "Export completed, downloading file");
        let temp_dir = self
            .settings
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let download = download_export(self.client, &location, &temp_dir, cancel).await?;
        progress.report(
            80,
            &format!("Downloaded {} bytes ({:?})", download.bytes(), download.framing()),
        );

        progress.report(85, "Analyzing audit logs");
        let path = download.path().to_path_buf();
        let analysis = tokio::task::spawn_blocking(move || analyze_file(path))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result);

        match download.close() {
            Ok(()) => progress.report(95, "Temporary files cleaned up"),
            Err(e) => warn!(error = %e, "could not remove temporary export file"),
        }

        let analysis = analysis?;
        let formatted_summary = format_summary(&analysis);
        info!(
            total_logs = analysis.total_logs,
            skipped_lines = analysis.skipped_lines,
            "audit log analysis complete"
        );
        progress.report(100, "Audit log analysis completed");

        Ok(SuccessResponse {
            success: true,
            export_job: job.clone(),
            message: format!(
                "Retrieved and analyzed {} audit log entries",
                analysis.total_logs
            ),
            analysis,
            formatted_summary,
            warnings,
        })
    }
}
