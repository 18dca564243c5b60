//! Comparison, rewriting and merge primitives for `styleconf_ir::Document`.
//!
//! This crate reconciles whole-text snapshots of a `style.conf`: it aligns
//! lines with an LCS edit script, maps live lines back to a baseline, writes
//! value edits back with minimal text changes, and builds per-item merge
//! candidates against an old revision.
//!
//! Primary entrypoints:
//! - [`diff_and_merge`] and [`build_diff_rows`]
//! - [`build_line_map`]
//! - [`apply_value_only`]
//! - [`build_merge_candidates`] and [`merge_texts`]
//! - [`EditSession`]
//!
//! # Example
//!
//! ```rust
//! use styleconf_diff::{build_merge_candidates, merge_texts};
//! use styleconf_ir::parse;
//!
//! let new_text = "[Colors]\nAccent = ff0000\n";
//! let old_text = "[Colors]\nAccent = 00ff00\n";
//! let mut candidates = build_merge_candidates(&parse(new_text), &parse(old_text));
//! candidates[0].prefer_new = false;
//!
//! let merged = merge_texts(new_text, &candidates, false);
//! assert_eq!(merged.text, "[Colors]\nAccent = 00ff00\n");
//! assert!(!merged.used_structural_rewrite);
//! ```

mod engine;
mod line_map;
mod merge;
mod model;
mod report;
mod rewrite;
mod session;
mod timer;

pub use engine::{build_diff_rows, diff_and_merge, diff_lines, merge_replaces};
pub use line_map::{
    build_line_map, closest_by_line_distance, find_field_by_signature, find_line_by_signature,
    find_row_by_signature, find_row_for_line, item_for_line, signature_anchors,
};
pub use merge::{
    apply_merge_selections, apply_preference, build_merge_candidates, choose, merge_description,
    merge_texts, set_all_choices,
};
pub use model::{
    ChangedLine, DiffRow, DiffStats, EditOp, LineMap, LineState, MergeCandidate, MergeOptions,
    RewriteOutcome, RowKind, Side,
};
pub use report::{
    CHANGED_LINES_LIMIT, format_changed_lines_report, format_diff_rows, format_merge_report,
};
pub use rewrite::{apply_value_only, patch_item_line, replace_value};
pub use session::{Baseline, EditSession, ImportOptions, OldRevision, PollOutcome, SessionError};
pub use timer::{CoalescingTimer, HISTORY_COMMIT_DELAY, REPARSE_DELAY, SyncTimers};

#[cfg(test)]
mod tests;
