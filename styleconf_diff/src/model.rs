use serde::{Deserialize, Serialize};
use styleconf_ir::{ItemEntry, ItemSignature};

/// One line-level edit script operation. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditOp {
    Equal {
        left_text: String,
        right_text: String,
        left_line: usize,
        right_line: usize,
    },
    Insert {
        right_text: String,
        right_line: usize,
    },
    Delete {
        left_text: String,
        left_line: usize,
    },
    Replace {
        left_text: String,
        right_text: String,
        left_line: usize,
        right_line: usize,
    },
}

impl EditOp {
    pub fn left_line(&self) -> Option<usize> {
        match self {
            EditOp::Equal { left_line, .. }
            | EditOp::Delete { left_line, .. }
            | EditOp::Replace { left_line, .. } => Some(*left_line),
            EditOp::Insert { .. } => None,
        }
    }

    pub fn right_line(&self) -> Option<usize> {
        match self {
            EditOp::Equal { right_line, .. }
            | EditOp::Insert { right_line, .. }
            | EditOp::Replace { right_line, .. } => Some(*right_line),
            EditOp::Delete { .. } => None,
        }
    }

    /// Text contributed to the right-hand sequence, if any.
    pub fn right_text(&self) -> Option<&str> {
        match self {
            EditOp::Equal { right_text, .. }
            | EditOp::Insert { right_text, .. }
            | EditOp::Replace { right_text, .. } => Some(right_text),
            EditOp::Delete { .. } => None,
        }
    }
}

/// Aggregate counters for an edit script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiffStats {
    pub equal: usize,
    pub inserts: usize,
    pub deletes: usize,
    pub replaces: usize,
}

impl DiffStats {
    pub fn from_ops(ops: &[EditOp]) -> Self {
        let mut stats = Self::default();
        for op in ops {
            match op {
                EditOp::Equal { .. } => stats.equal += 1,
                EditOp::Insert { .. } => stats.inserts += 1,
                EditOp::Delete { .. } => stats.deletes += 1,
                EditOp::Replace { .. } => stats.replaces += 1,
            }
        }
        stats
    }

    pub fn has_changes(&self) -> bool {
        self.inserts + self.deletes + self.replaces > 0
    }
}

/// Presentation class of a comparison row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Same,
    Added,
    Removed,
    Changed,
}

impl RowKind {
    pub fn marker(self) -> char {
        match self {
            RowKind::Same => '=',
            RowKind::Added => '+',
            RowKind::Removed => '-',
            RowKind::Changed => '~',
        }
    }
}

/// One row of the side-by-side comparison against the old revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub kind: RowKind,
    pub title: String,
    pub right_text: String,
    pub left_line: Option<usize>,
    pub right_line: Option<usize>,
    pub signature: Option<ItemSignature>,
}

impl DiffRow {
    /// Line used when ranking rows by distance: left line, else right line.
    pub fn anchor_line(&self) -> usize {
        self.left_line.or(self.right_line).unwrap_or(0)
    }
}

/// Per-line mapping from a current text to 0-based baseline line indexes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct LineMap(pub Vec<Option<usize>>);

impl LineMap {
    /// Baseline index for 0-based current line `idx`.
    pub fn get(&self, idx: usize) -> Option<usize> {
        self.0.get(idx).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.0.iter().copied()
    }
}

/// Result of a rewrite showing which path produced the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    pub text: String,
    pub used_structural_rewrite: bool,
}

/// One disagreeing or one-sided item between a new and an old document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeCandidate {
    pub signature: ItemSignature,
    pub section_name: String,
    pub key: String,
    pub new_item: Option<ItemEntry>,
    pub old_item: Option<ItemEntry>,
    pub prefer_new: bool,
}

impl MergeCandidate {
    /// Item on the preferred side.
    pub fn selected(&self) -> Option<&ItemEntry> {
        if self.prefer_new {
            self.new_item.as_ref()
        } else {
            self.old_item.as_ref()
        }
    }

    /// Item on the side that is not preferred.
    pub fn other(&self) -> Option<&ItemEntry> {
        if self.prefer_new {
            self.old_item.as_ref()
        } else {
            self.new_item.as_ref()
        }
    }
}

/// Side chosen by default for every merge candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    New,
    Old,
}

/// Options controlling how merge selections are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub prefer: Side,
    pub use_other_when_missing: bool,
}

impl MergeOptions {
    pub fn new(prefer: Side) -> Self {
        Self {
            prefer,
            use_other_when_missing: false,
        }
    }

    /// Fall back to the other side when the preferred side lacks the item.
    pub fn with_use_other_when_missing(mut self, enabled: bool) -> Self {
        self.use_other_when_missing = enabled;
        self
    }
}

/// A line that differs from the baseline, as shown before saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedLine {
    pub line_number: usize,
    pub before: String,
    pub after: String,
}

/// Edited-state of one line of the live text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineState {
    pub line_number: usize,
    pub edited: bool,
    pub is_key_line: bool,
    /// 0-based baseline line this line corresponds to.
    pub baseline_line: Option<usize>,
    pub baseline_text: String,
    pub can_reset: bool,
}
