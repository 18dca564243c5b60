use std::collections::BTreeMap;

use styleconf_ir::ItemEntry;

use crate::merge::merge_description;
use crate::model::{ChangedLine, DiffRow, MergeCandidate};

/// Entries listed before the changed-lines report is truncated.
pub const CHANGED_LINES_LIMIT: usize = 200;

/// Plain-text review of `changed` with optional per-line descriptions.
pub fn format_changed_lines_report(
    changed: &[ChangedLine],
    descriptions: &BTreeMap<usize, String>,
) -> String {
    if changed.is_empty() {
        return "No changes detected.\n".to_string();
    }

    let mut out = String::new();
    for line in changed.iter().take(CHANGED_LINES_LIMIT) {
        let description = descriptions
            .get(&line.line_number)
            .map(|d| inline_description(d))
            .unwrap_or_default();
        if description.is_empty() {
            out.push_str(&format!("Line {}\n", line.line_number));
        } else {
            out.push_str(&format!("Line {} - {description}\n", line.line_number));
        }
        out.push_str(&format!("- {}\n", line.before));
        out.push_str(&format!("+ {}\n", line.after));
    }

    if changed.len() > CHANGED_LINES_LIMIT {
        out.push_str(&format!(
            "... and {} more changed lines\n",
            changed.len() - CHANGED_LINES_LIMIT
        ));
    }
    out
}

// Multi-line descriptions collapse to one line joined by " / ".
fn inline_description(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// One block per candidate with both sides and the current choice.
pub fn format_merge_report(candidates: &[MergeCandidate]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Merge confirmation ({} items)\n", candidates.len()));

    for candidate in candidates {
        let choice = if candidate.prefer_new { "new" } else { "old" };
        out.push_str(&format!(
            "\n[{}] {} (use {choice})\n",
            candidate.section_name, candidate.key
        ));

        let description = merge_description(candidate);
        for line in description.lines() {
            out.push_str(&format!("  # {line}\n"));
        }

        let value_of = |item: Option<&ItemEntry>| {
            item.map_or_else(|| "(missing)".to_string(), |item| item.value.clone())
        };
        out.push_str(&format!("  New: {}\n", value_of(candidate.new_item.as_ref())));
        out.push_str(&format!("  Old: {}\n", value_of(candidate.old_item.as_ref())));
    }
    out
}

/// Old-side comparison rows as `<old line> <marker> <text>`.
pub fn format_diff_rows(rows: &[DiffRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let label = row
            .right_line
            .map_or_else(|| "·".to_string(), |line| line.to_string());
        out.push_str(&format!("{label:>4} {} {}\n", row.kind.marker(), row.right_text));
    }
    out
}
