//! Audit log export retrieval and analysis.
//!
//! Stages, leaf first:
//!
//! - [`resolver`] - service and client names to console identifiers
//! - [`export`] - export filter, job submission and polling
//! - [`download`] - streaming download and in-place decompression
//! - [`analyzer`] - single-pass aggregation of decoded records
//! - [`narrative`] - text report of an analysis
//! - [`pipeline`] - the end-to-end operation tying the stages together
//!
//! [`types`] holds the record model and [`actions`] the catalog of known
//! action codes.

pub mod actions;
pub mod analyzer;
pub mod download;
pub mod export;
pub mod narrative;
pub mod pipeline;
pub mod resolver;
pub mod types;
