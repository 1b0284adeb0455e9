//! Plain-text rendering of an [`AnalysisSummary`] for humans.

use crate::audit::analyzer::{AnalysisSummary, Breakdown, NO_LOGS_MESSAGE};
use crate::utils::format::{format_number, percentage, plural, truncate};
use crate::utils::time::{duration_human, parse_timestamp};
use std::fmt::Write;

const WIDTH: usize = 100;

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title);
    let _ = writeln!(out, "{}", "-".repeat(WIDTH));
}

fn breakdown_table(out: &mut String, header: &str, breakdown: &Breakdown, total: usize) {
    let _ = writeln!(out, "{:<60} {:>15} {:>12}", header, "Count", "Percentage");
    let mut rows: Vec<(&String, &usize)> = breakdown.breakdown.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1));
    for (key, count) in rows {
        let _ = writeln!(
            out,
            "{:<60} {:>15} {:>11.2}%",
            truncate(key, 60),
            format_number(*count),
            percentage(*count, total)
        );
    }
}

/// Render a summary as a fixed-layout text report.
///
/// Sections with nothing to show are left out. A summary with no records
/// renders as the no-logs message alone.
pub fn format_summary(summary: &AnalysisSummary) -> String {
    if summary.is_empty() {
        let mut out = summary
            .message
            .clone()
            .unwrap_or_else(|| NO_LOGS_MESSAGE.to_string());
        if summary.skipped_lines > 0 {
            let _ = write!(
                out,
                " ({} malformed {} skipped)",
                format_number(summary.skipped_lines),
                plural(summary.skipped_lines, "line", "lines")
            );
        }
        return out;
    }

    let total = summary.total_logs;
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(WIDTH));
    let _ = writeln!(out, "Audit Log Summary");
    let _ = writeln!(out, "{}", "=".repeat(WIDTH));
    let _ = writeln!(out, "Total logs: {}", format_number(total));
    if summary.skipped_lines > 0 {
        let _ = writeln!(
            out,
            "Malformed lines skipped: {}",
            format_number(summary.skipped_lines)
        );
    }

    if let (Some(earliest), Some(latest)) = (
        summary.time_range.earliest.as_deref(),
        summary.time_range.latest.as_deref(),
    ) {
        let _ = write!(out, "Time period: {} to {}", earliest, latest);
        if let (Ok(start), Ok(end)) = (parse_timestamp(earliest), parse_timestamp(latest)) {
            let _ = write!(out, " ({})", duration_human(&start, &end));
        }
        let _ = writeln!(out);
    }

    let actions = &summary.action_summary;
    if !actions.most_common_actions.is_empty() {
        section(
            &mut out,
            &format!(
                "Most Common Operations ({} unique)",
                format_number(actions.total_unique_actions)
            ),
        );
        for (rank, entry) in actions.most_common_actions.iter().enumerate() {
            let _ = write!(
                out,
                "{:>2}. {:<40} {:>10} ({:.1}%)",
                rank + 1,
                truncate(&entry.action, 40),
                format_number(entry.count),
                percentage(entry.count, total)
            );
            if let Some(description) = entry.description {
                let _ = write!(out, "  {}", description);
            }
            let _ = writeln!(out);
        }
    }

    if !summary.status_summary.breakdown.is_empty() {
        section(&mut out, "Status Breakdown");
        breakdown_table(&mut out, "Status", &summary.status_summary, total);
    }

    if !summary.source_summary.breakdown.is_empty() {
        section(&mut out, "Source Breakdown");
        breakdown_table(&mut out, "Source", &summary.source_summary, total);
    }

    if !summary.recent_activity.is_empty() {
        section(&mut out, "Recent Activity");
        for record in &summary.recent_activity {
            let _ = writeln!(
                out,
                "{:<30} {:<40} {:<20} {}",
                record.time().unwrap_or("-"),
                truncate(record.action(), 40),
                truncate(record.status(), 20),
                record.source()
            );
            if let Some(actor) = record.actor_id() {
                let _ = writeln!(out, "{:<30} actor: {}", "", actor);
            }
        }
    }

    let _ = write!(out, "{}", "=".repeat(WIDTH));
    out
}
