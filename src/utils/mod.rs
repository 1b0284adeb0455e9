//! Utility functions and helpers.
//!
//! This module provides common functionality used across the pipeline and
//! the CLI commands:
//!
//! - [`progress`] - Stage progress reporting and the terminal progress bar
//! - [`time`] - Date normalization and timestamp helpers
//! - [`reader`] - Framing detection and transparent decompression
//! - [`format`] - Number and text formatting
//! - [`validate`] - Length and UUID checks for request parameters
//!
//! # Examples
//!
//! ## Normalizing request dates
//!
//! ```
//! use dpod_audit_tools::utils::time::normalize_date;
//!
//! assert_eq!(normalize_date("2025-04-01", true), "2025-04-01T00:00:00Z");
//! ```
//!
//! ## Reading a downloaded export
//!
//! ```no_run
//! use dpod_audit_tools::utils::reader::open_file;
//! use std::io::BufReader;
//!
//! // gzip and zstd are detected from the content, not the name
//! let reader = open_file("/tmp/export.json").unwrap();
//! let buf_reader = BufReader::new(reader);
//! ```

pub mod format;
pub mod progress;
pub mod reader;
pub mod time;
pub mod validate;
