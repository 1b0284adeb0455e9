//! # DPoD Audit Tools
//!
//! Command-line tools and a library for pulling audit logs out of a Data
//! Protection on Demand console and summarizing them.
//!
//! ## Overview
//!
//! Audit logs are not served directly: the console builds an export
//! asynchronously and publishes it at a download location. This crate drives
//! that whole flow. It resolves loosely specified service and client names to
//! console identifiers, submits the export, polls it with a bounded budget,
//! streams the artifact to a temporary file (gzip and zstd are unwrapped
//! transparently), and aggregates the records into a bounded summary.
//!
//! ## Architecture
//!
//! - [`audit`] - Export filters, job polling, download, analysis, and the
//!   end-to-end pipeline
//! - [`commands`] - CLI command implementations
//! - [`config`] - Connection settings from flags and environment
//! - [`console_api`] - Authenticated console API client
//! - [`error`] - Error taxonomy shared by every stage
//! - [`utils`] - Dates, decompression, formatting, progress, validation
//!
//! ## Example Usage
//!
//! ```bash
//! export DPOD_CLIENT_ID=... DPOD_CLIENT_SECRET=...
//!
//! # Summarize the last 7 days
//! dpod-audit audit-logs
//!
//! # One service, one month, saved as JSON
//! dpod-audit audit-logs --service payments-hsm \
//!     --start-date 2025-04-01 --end-date 2025-04-30 --output april.json
//!
//! # Submit an export and check on it later
//! dpod-audit export create --start-date 2025-04-01 --end-date 2025-04-02
//! dpod-audit export status 3f0e2a4c-7b1d-4c8e-9a5f-1d2e3c4b5a69
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use dpod_audit_tools::audit::pipeline::{AuditLogPipeline, LogsRequest, PipelineSettings};
//! use dpod_audit_tools::console_api::ConsoleClient;
//! use dpod_audit_tools::utils::progress::SilentProgress;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConsoleClient::with_token("https://console.example.com", "token")?;
//! let pipeline = AuditLogPipeline::new(&client, PipelineSettings::default());
//! let request = LogsRequest {
//!     source_filter: Some("cdsp".into()),
//!     ..Default::default()
//! };
//! let response = pipeline
//!     .retrieve_and_analyze(&request, &SilentProgress, &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod commands;
pub mod config;
pub mod console_api;
pub mod error;
pub mod utils;
