//! Retrieve and analyze audit logs for a time window.
//!
//! Runs the full export pipeline, prints the text summary to stdout, and
//! optionally writes the structured response to a file.
//!
//! # Usage
//!
//! ```bash
//! # Last 7 days, all sources
//! dpod-audit audit-logs
//!
//! # One HSM service by name, failures only, saved as JSON
//! dpod-audit audit-logs --service payments-hsm \
//!     --start-date 2025-04-01 --end-date 2025-04-30 \
//!     --status LUNA_RET_KEY_NOT_FOUND --output april.json
//!
//! # Data platform logs, breakdowns as CSV
//! dpod-audit audit-logs --source cdsp --output cdsp.csv
//! ```

use crate::audit::analyzer::AnalysisSummary;
use crate::audit::pipeline::{AuditLogPipeline, LogsRequest, LogsResponse, PipelineSettings};
use crate::config::ConsoleConfig;
use crate::console_api::ConsoleClient;
use crate::utils::progress::ProgressBar;
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// File format for `--output`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// Explicit format wins; otherwise `.csv` files get CSV and anything
    /// else JSON.
    pub fn resolve(format: Option<&str>, output: &str) -> Result<Self> {
        match format.map(str::to_lowercase).as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some(other) => Err(anyhow!("Invalid format: {}. Must be one of: json, csv", other)),
            None => {
                let is_csv = Path::new(output)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
                Ok(if is_csv { Self::Csv } else { Self::Json })
            }
        }
    }
}

/// Write action, status and source breakdowns as `category,key,count,description`.
pub fn write_breakdown_csv<W: Write>(writer: W, analysis: &AnalysisSummary) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["category", "key", "count", "description"])?;

    for (action, stat) in &analysis.action_summary.all_actions {
        writer.write_record([
            "action",
            action.as_str(),
            stat.count.to_string().as_str(),
            stat.description.unwrap_or_default(),
        ])?;
    }
    for (category, breakdown) in [
        ("status", &analysis.status_summary),
        ("source", &analysis.source_summary),
    ] {
        for (key, count) in &breakdown.breakdown {
            writer.write_record([category, key.as_str(), count.to_string().as_str(), ""])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_output(response: &LogsResponse, output: &str, format: OutputFormat) -> Result<()> {
    if let Some(parent) = Path::new(output).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match (format, response) {
        (OutputFormat::Json, _) => {
            let file = File::create(output).context("Failed to create output file")?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, response)
                .context("Failed to serialize response to JSON")?;
            writer.flush()?;
        }
        (OutputFormat::Csv, LogsResponse::Success(success)) => {
            let file = File::create(output).context("Failed to create output file")?;
            write_breakdown_csv(file, &success.analysis)?;
        }
        (OutputFormat::Csv, LogsResponse::Failure(_)) => {
            eprintln!("No CSV written: retrieval did not succeed");
            return Ok(());
        }
    }

    eprintln!("Output written to: {}", output);
    Ok(())
}

pub async fn run(
    config: &ConsoleConfig,
    request: LogsRequest,
    settings: PipelineSettings,
    output: Option<&str>,
    format: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let output_format = output
        .map(|path| OutputFormat::resolve(format, path))
        .transpose()?;
    let client = ConsoleClient::new(config).context("Failed to create console client")?;

    eprintln!("Retrieving audit logs from {}", client.base_url());

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new("audit-logs")
    };

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let pipeline = AuditLogPipeline::new(&client, settings);
    let result = pipeline.retrieve_and_analyze(&request, &bar, &cancel).await;
    ctrl_c.abort();
    bar.clear();

    let response = result.context("Invalid audit log request")?;

    if let (Some(path), Some(format)) = (output, output_format) {
        write_output(&response, path, format)?;
    }

    match response {
        LogsResponse::Success(success) => {
            for warning in &success.warnings {
                eprintln!("Warning: {}", warning);
            }
            println!("{}", success.formatted_summary);
            eprintln!(
                "\nExport job {} ({})",
                success.export_job.job_id, success.export_job.state
            );
            Ok(())
        }
        LogsResponse::Failure(failure) => {
            if let Some(job) = &failure.export_job {
                eprintln!("Export job {} ended as {}", job.job_id, job.state);
            }
            bail!("Audit log retrieval failed: {}", failure.error)
        }
    }
}
