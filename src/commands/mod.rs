//! Command implementations for the `dpod-audit` CLI.
//!
//! - [`audit_logs`] - Retrieve, download and summarize audit logs in one step
//! - [`export_jobs`] - Create an export job or check one, without waiting
//!
//! Commands print reports to stdout and progress or diagnostics to stderr,
//! so output can be piped or redirected safely.

pub mod audit_logs;
pub mod export_jobs;
