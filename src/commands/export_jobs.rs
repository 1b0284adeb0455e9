//! Standalone export job operations.
//!
//! `export create` submits an export without waiting for it; `export status`
//! looks up one job, e.g. to fetch its download location later.

use crate::audit::export::{ExportFilter, ExportJob, ExportJobClient, PollSettings};
use crate::config::ConsoleConfig;
use crate::console_api::ConsoleClient;
use crate::utils::time::normalize_date;
use crate::utils::validate::uuid_param;
use anyhow::{Context, Result};

/// Filter fields accepted by `export create`
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub start_date: String,
    pub end_date: String,
    pub tenant_id: Option<String>,
    pub source: Option<String>,
    pub resource_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub status: Option<String>,
}

impl CreateOptions {
    /// Normalize the dates and validate every field.
    pub fn to_filter(&self) -> Result<ExportFilter> {
        let filter = ExportFilter::new(
            normalize_date(&self.start_date, true),
            normalize_date(&self.end_date, false),
        )
        .with_tenant_id(self.tenant_id.clone())
        .with_source(self.source.clone())
        .with_resource_id(self.resource_id.clone())
        .with_actor_id(self.actor_id.clone())
        .with_action(self.action.clone())
        .with_status(self.status.clone())
        .validate()?;
        Ok(filter)
    }
}

fn print_job(job: &ExportJob) -> Result<()> {
    let json = serde_json::to_string_pretty(job).context("Failed to serialize export job")?;
    println!("{}", json);
    Ok(())
}

pub async fn run_create(config: &ConsoleConfig, options: &CreateOptions) -> Result<()> {
    let filter = options.to_filter()?;
    let client = ConsoleClient::new(config).context("Failed to create console client")?;

    eprintln!(
        "Creating audit log export for {} to {}",
        filter.from(),
        filter.to()
    );
    let job = ExportJobClient::new(&client, PollSettings::default())
        .submit(&filter)
        .await
        .context("Failed to create export job")?;

    print_job(&job)?;
    eprintln!(
        "Check progress with: dpod-audit export status {}",
        job.job_id
    );
    Ok(())
}

pub async fn run_status(config: &ConsoleConfig, job_id: &str) -> Result<()> {
    let job_id = uuid_param(job_id, "job_id")?;
    let client = ConsoleClient::new(config).context("Failed to create console client")?;

    let job = ExportJobClient::new(&client, PollSettings::default())
        .fetch(&job_id)
        .await
        .with_context(|| format!("Failed to fetch export job {}", job_id))?;

    print_job(&job)?;
    match (job.progress, job.download_location()) {
        (_, Some(location)) => eprintln!("Download location: {}", location),
        (Some(progress), None) => eprintln!("Job {}: {:.0}% complete", job.state, progress),
        (None, None) => eprintln!("Job {}", job.state),
    }
    Ok(())
}
