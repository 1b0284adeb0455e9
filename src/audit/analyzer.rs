//! Single-pass aggregation of a downloaded export.
//!
//! The export is newline-delimited JSON. Each line is decoded on its own so a
//! truncated or corrupt line costs exactly one record: it is logged, counted
//! in [`AnalysisSummary::skipped_lines`], and the scan continues.

use crate::audit::actions;
use crate::audit::types::AuditRecord;
use crate::utils::reader::open_file;
use crate::utils::time::compare_timestamps;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Entries kept in [`ActionSummary::most_common_actions`].
pub const TOP_ACTIONS: usize = 10;
/// Records kept in [`AnalysisSummary::recent_activity`].
pub const RECENT_ACTIVITY: usize = 10;
pub const NO_LOGS_MESSAGE: &str = "No audit logs found in the specified time range";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStat {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedAction {
    pub action: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionSummary {
    pub total_unique_actions: usize,
    pub most_common_actions: Vec<RankedAction>,
    pub all_actions: BTreeMap<String, ActionStat>,
}

/// Histogram of one categorical field, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub total_unique: usize,
    pub breakdown: BTreeMap<String, usize>,
}

impl Breakdown {
    fn from_counts(counts: HashMap<String, usize>) -> Self {
        Self {
            total_unique: counts.len(),
            breakdown: counts.into_iter().collect(),
        }
    }

    pub fn count(&self, key: &str) -> usize {
        self.breakdown.get(key).copied().unwrap_or(0)
    }
}

/// Aggregate view of one export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_logs: usize,
    pub skipped_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub time_range: TimeRange,
    pub action_summary: ActionSummary,
    pub status_summary: Breakdown,
    pub source_summary: Breakdown,
    pub recent_activity: Vec<AuditRecord>,
}

impl AnalysisSummary {
    pub fn is_empty(&self) -> bool {
        self.total_logs == 0
    }

    pub fn action_count(&self, action: &str) -> usize {
        self.action_summary
            .all_actions
            .get(action)
            .map_or(0, |stat| stat.count)
    }
}

#[derive(Default)]
struct Aggregator {
    total: usize,
    skipped: usize,
    actions: HashMap<String, usize>,
    statuses: HashMap<String, usize>,
    sources: HashMap<String, usize>,
    earliest: Option<String>,
    latest: Option<String>,
    recent: Vec<AuditRecord>,
}

impl Aggregator {
    fn ingest(&mut self, record: AuditRecord) {
        self.total += 1;
        *self.actions.entry(record.action().to_string()).or_insert(0) += 1;
        *self.statuses.entry(record.status().to_string()).or_insert(0) += 1;
        *self.sources.entry(record.source().to_string()).or_insert(0) += 1;

        if let Some(time) = record.time() {
            if self
                .earliest
                .as_deref()
                .map_or(true, |e| compare_timestamps(time, e) == Ordering::Less)
            {
                self.earliest = Some(time.to_string());
            }
            if self
                .latest
                .as_deref()
                .map_or(true, |l| compare_timestamps(time, l) == Ordering::Greater)
            {
                self.latest = Some(time.to_string());
            }
        }

        if self.recent.len() < RECENT_ACTIVITY {
            self.recent.push(record);
        }
    }

    fn finish(self) -> AnalysisSummary {
        if self.total == 0 {
            return AnalysisSummary {
                skipped_lines: self.skipped,
                message: Some(NO_LOGS_MESSAGE.to_string()),
                ..Default::default()
            };
        }

        let all_actions: BTreeMap<String, ActionStat> = self
            .actions
            .into_iter()
            .map(|(action, count)| {
                let description = actions::describe(&action);
                (action, ActionStat { count, description })
            })
            .collect();

        let mut ranked: Vec<RankedAction> = all_actions
            .iter()
            .map(|(action, stat)| RankedAction {
                action: action.clone(),
                count: stat.count,
                description: stat.description,
            })
            .collect();
        // BTreeMap order breaks ties alphabetically; sort_by is stable
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(TOP_ACTIONS);

        AnalysisSummary {
            total_logs: self.total,
            skipped_lines: self.skipped,
            message: None,
            time_range: TimeRange {
                earliest: self.earliest,
                latest: self.latest,
            },
            action_summary: ActionSummary {
                total_unique_actions: all_actions.len(),
                most_common_actions: ranked,
                all_actions,
            },
            status_summary: Breakdown::from_counts(self.statuses),
            source_summary: Breakdown::from_counts(self.sources),
            recent_activity: self.recent,
        }
    }
}

/// Analyze newline-delimited JSON records from a reader.
///
/// Only I/O errors are returned; undecodable lines are skipped.
pub fn analyze_reader<R: BufRead>(reader: R) -> io::Result<AnalysisSummary> {
    let mut aggregator = Aggregator::default();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let line_number = idx + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<AuditRecord>(&line) {
            Ok(record) => aggregator.ingest(record),
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping malformed audit record");
                aggregator.skipped += 1;
            }
        }
    }

    debug!(
        records = aggregator.total,
        skipped = aggregator.skipped,
        "finished scanning export"
    );
    Ok(aggregator.finish())
}

/// Analyze an export file. Compressed files are decoded transparently.
pub fn analyze_file(path: impl AsRef<Path>) -> io::Result<AnalysisSummary> {
    let reader = open_file(path)?;
    analyze_reader(BufReader::new(reader))
}
