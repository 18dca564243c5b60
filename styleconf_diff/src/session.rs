use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use styleconf_ir::{
    Document, ItemSignature, LineRef, ParseError, build_line_refs, parse, parse_checked,
    split_lines,
};
use thiserror::Error;

use crate::engine::build_diff_rows;
use crate::line_map::build_line_map;
use crate::merge::{build_merge_candidates, merge_texts};
use crate::model::{ChangedLine, DiffRow, LineMap, LineState, MergeCandidate, RewriteOutcome};
use crate::rewrite::patch_item_line;
use crate::timer::SyncTimers;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Open an old style.conf first.")]
    NoComparison,
}

/// Snapshot the live text is compared against for edited-state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Baseline {
    text: String,
    values: BTreeMap<ItemSignature, String>,
}

impl Baseline {
    /// Capture `raw` (CRLF normalized) and the item values of `doc`.
    pub fn capture(doc: &Document, raw: &str) -> Self {
        let values = doc
            .item_map()
            .into_iter()
            .map(|(signature, entry)| (signature, entry.value))
            .collect();
        Self {
            text: raw.replace("\r\n", "\n"),
            values,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.text)
    }

    pub fn value_of(&self, section: &str, key: &str) -> Option<&str> {
        let signature = ItemSignature::new(section, key)?;
        self.values.get(&signature).map(String::as_str)
    }
}

/// Old revision loaded for comparison and merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OldRevision {
    pub name: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Keep the given text instead of replacing it with the rendered document.
    pub keep_source_text: bool,
    pub set_as_baseline: bool,
}

impl ImportOptions {
    pub fn keep_source_text(mut self, enabled: bool) -> Self {
        self.keep_source_text = enabled;
        self
    }

    pub fn set_as_baseline(mut self, enabled: bool) -> Self {
        self.set_as_baseline = enabled;
        self
    }
}

/// What [`EditSession::poll`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollOutcome {
    /// The reparse deadline fired.
    pub reparsed: bool,
    /// Set when the fired reparse was rejected; the previous document is kept.
    pub parse_error: Option<ParseError>,
    /// The host should commit a history snapshot of the current text.
    pub history_commit_due: bool,
}

/// Live editing state: the source text, its parsed document, the baseline
/// and an optional old revision.
///
/// The text is authoritative. Every programmatic change rewrites the text
/// and re-parses it immediately without arming the input timers.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    document: Document,
    source_text: String,
    baseline: Baseline,
    old: Option<OldRevision>,
    timers: SyncTimers,
}

impl EditSession {
    /// Start a session whose text and baseline are `text`.
    pub fn load(text: &str) -> Result<Self, ParseError> {
        let mut session = Self::default();
        session.import_text(
            text,
            ImportOptions::default()
                .keep_source_text(true)
                .set_as_baseline(true),
        )?;
        Ok(session)
    }

    /// Replace the document with a checked parse of `text`.
    ///
    /// On failure nothing changes.
    pub fn import_text(&mut self, text: &str, options: ImportOptions) -> Result<(), ParseError> {
        let doc = parse_checked(text)?;
        if options.set_as_baseline {
            self.baseline = Baseline::capture(&doc, text);
        }
        self.source_text = if options.keep_source_text {
            text.to_string()
        } else {
            doc.render()
        };
        self.document = doc;
        tracing::trace!(sections = self.document.sections.len(), "imported text");
        Ok(())
    }

    // The text is stored even when the reparse is rejected.
    fn assign_text(&mut self, text: String) -> Result<(), ParseError> {
        self.source_text = text;
        self.document = parse_checked(&self.source_text)?;
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn old(&self) -> Option<&OldRevision> {
        self.old.as_ref()
    }

    pub fn source_lines(&self) -> Vec<String> {
        split_lines(&self.source_text)
    }

    pub fn line_refs(&self) -> Vec<LineRef> {
        build_line_refs(&self.source_lines())
    }

    /// `true` when the baseline has the item and its value differs.
    pub fn is_item_edited(&self, section: &str, key: &str) -> bool {
        let Some(item) = self.document.item(section, key) else {
            return false;
        };
        self.baseline
            .value_of(section, key)
            .is_some_and(|baseline| baseline != item.value)
    }

    pub fn baseline_value(&self, section: &str, key: &str) -> Option<&str> {
        self.baseline.value_of(section, key)
    }

    pub fn line_map(&self) -> LineMap {
        build_line_map(&self.source_lines(), &self.baseline.lines())
    }

    /// Edited-state of every live line.
    ///
    /// Unmatched lines are edited. A line can be reset only when it is a
    /// key line with a baseline match that differs.
    pub fn line_states(&self) -> Vec<LineState> {
        let current = self.source_lines();
        let baseline = self.baseline.lines();
        let map = build_line_map(&current, &baseline);
        let refs = build_line_refs(&current);

        current
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let baseline_line = map.get(idx);
                let baseline_text = baseline_line
                    .and_then(|b| baseline.get(b))
                    .cloned()
                    .unwrap_or_default();
                let edited = baseline_line.is_none() || *text != baseline_text;
                let is_key_line = refs.get(idx).is_some_and(|r| r.signature.is_some());
                LineState {
                    line_number: idx + 1,
                    edited,
                    is_key_line,
                    baseline_line,
                    can_reset: is_key_line && baseline_line.is_some() && edited,
                    baseline_text,
                }
            })
            .collect()
    }

    /// Lines to review before saving, ordered by live line number.
    ///
    /// Baseline lines no live line maps to are listed as removals at the
    /// first live line mapped past them, or one past the end.
    pub fn changed_lines(&self) -> Vec<ChangedLine> {
        let current = self.source_lines();
        let baseline = self.baseline.lines();
        let map = build_line_map(&current, &baseline);

        let mut changed = Vec::new();
        let mut used = BTreeSet::new();
        for (idx, after) in current.iter().enumerate() {
            let before = match map.get(idx) {
                Some(b) => {
                    used.insert(b);
                    baseline.get(b).cloned().unwrap_or_default()
                }
                None => String::new(),
            };
            if before != *after {
                changed.push(ChangedLine {
                    line_number: idx + 1,
                    before,
                    after: after.clone(),
                });
            }
        }

        for (b, before) in baseline.iter().enumerate() {
            if used.contains(&b) {
                continue;
            }
            let line_number = map
                .iter()
                .position(|mapped| mapped.is_some_and(|m| m > b))
                .map_or(current.len() + 1, |idx| idx + 1);
            changed.push(ChangedLine {
                line_number,
                before: before.clone(),
                after: String::new(),
            });
        }

        changed.sort_by_key(|line| line.line_number);
        changed
    }

    /// Item descriptions by live line number.
    ///
    /// Key lines of the live text use their own comments; other lines take
    /// the description of the baseline key line they map to.
    pub fn line_descriptions(&self) -> BTreeMap<usize, String> {
        let mut descriptions = descriptions_by_line(&parse(&self.source_text));
        if self.baseline.text.is_empty() {
            return descriptions;
        }

        let baseline_descriptions = descriptions_by_line(&parse(&self.baseline.text));
        for (idx, mapped) in self.line_map().iter().enumerate() {
            let line_number = idx + 1;
            if descriptions.contains_key(&line_number) {
                continue;
            }
            if let Some(description) = mapped.and_then(|b| baseline_descriptions.get(&(b + 1))) {
                descriptions.insert(line_number, description.clone());
            }
        }
        descriptions
    }

    /// Restore live line `line` (1-based) to its mapped baseline text.
    ///
    /// Returns `Ok(false)` when the line is unmatched or already equal.
    pub fn reset_line_to_baseline(&mut self, line: usize) -> Result<bool, ParseError> {
        let Some(idx) = line.checked_sub(1) else {
            return Ok(false);
        };
        let mut lines = self.source_lines();
        let baseline = self.baseline.lines();
        let Some(b) = build_line_map(&lines, &baseline).get(idx) else {
            return Ok(false);
        };
        let baseline_text = baseline.get(b).cloned().unwrap_or_default();
        let Some(slot) = lines.get_mut(idx) else {
            return Ok(false);
        };
        if *slot == baseline_text {
            return Ok(false);
        }

        *slot = baseline_text;
        self.assign_text(lines.join("\n"))?;
        Ok(true)
    }

    /// Write the baseline value of `(section, key)` back to its key line.
    pub fn reset_item_to_baseline(&mut self, section: &str, key: &str) -> Result<bool, ParseError> {
        let Some(value) = self.baseline.value_of(section, key).map(str::to_string) else {
            return Ok(false);
        };
        self.set_item_value(section, key, &value)
    }

    /// Patch the value of `(section, key)` into its key line and re-parse.
    ///
    /// Returns `Ok(false)` when the item is missing or already has `value`.
    pub fn set_item_value(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
    ) -> Result<bool, ParseError> {
        let Some(item) = self.document.item(section, key) else {
            return Ok(false);
        };
        if item.value == value {
            return Ok(false);
        }

        let patched = patch_item_line(&self.source_text, &item.key, value, item.line_number);
        self.assign_text(patched)?;
        Ok(true)
    }

    pub fn set_old(&mut self, name: Option<String>, text: impl Into<String>) {
        self.old = Some(OldRevision {
            name,
            text: text.into(),
        });
    }

    pub fn clear_old(&mut self) {
        self.old = None;
    }

    fn old_text(&self) -> Result<&str, SessionError> {
        match &self.old {
            Some(old) if !old.text.is_empty() => Ok(&old.text),
            _ => Err(SessionError::NoComparison),
        }
    }

    /// Comparison rows between the live text and the old revision.
    pub fn diff_rows(&self) -> Result<Vec<DiffRow>, SessionError> {
        let old = split_lines(self.old_text()?);
        Ok(build_diff_rows(&self.source_lines(), &old))
    }

    /// Merge candidates between the live text (new) and the old revision.
    pub fn merge_candidates(&self) -> Result<Vec<MergeCandidate>, SessionError> {
        let old_doc = parse_checked(self.old_text()?)?;
        let new_doc = parse_checked(&self.source_text)?;
        Ok(build_merge_candidates(&new_doc, &old_doc))
    }

    /// Apply chosen candidates to the live text.
    pub fn apply_merge(
        &mut self,
        candidates: &[MergeCandidate],
        use_other_when_missing: bool,
    ) -> Result<RewriteOutcome, SessionError> {
        self.old_text()?;
        let outcome = merge_texts(&self.source_text, candidates, use_other_when_missing);
        self.assign_text(outcome.text.clone())?;
        Ok(outcome)
    }

    /// Record a keystroke-level text change and arm both timers.
    pub fn on_text_input(&mut self, text: impl Into<String>, now: Instant) {
        self.source_text = text.into();
        self.timers.reparse.arm(now);
        self.timers.history_commit.arm(now);
    }

    /// Fire whichever timers are due at `now`.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        if self.timers.reparse.fire_if_due(now) {
            outcome.reparsed = true;
            match parse_checked(&self.source_text) {
                Ok(doc) => self.document = doc,
                Err(err) => {
                    tracing::debug!(%err, "deferred reparse rejected");
                    outcome.parse_error = Some(err);
                }
            }
        }
        outcome.history_commit_due = self.timers.history_commit.fire_if_due(now);

        outcome
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }
}

fn descriptions_by_line(doc: &Document) -> BTreeMap<usize, String> {
    doc.items()
        .filter_map(|(_, item)| {
            let description = item.description();
            match (item.line_number, description.is_empty()) {
                (Some(line), false) => Some((line, description)),
                _ => None,
            }
        })
        .collect()
}
