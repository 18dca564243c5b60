use styleconf_ir::{Document, Item, ItemSignature, LineRef, Section, parse_checked};

use crate::engine::diff_and_merge;
use crate::model::{DiffRow, EditOp, LineMap};

/// Map every line of `current` to its most plausible line in `baseline`.
///
/// The LCS alignment (baseline on the left) maps `equal` and `replace`
/// lines. Item key lines and their shared comment lines are then forced
/// onto their signature counterparts. When the anchor pass is unavailable
/// the LCS map is returned as is.
pub fn build_line_map<S: AsRef<str>>(current: &[S], baseline: &[S]) -> LineMap {
    let mut map = vec![None; current.len()];

    for op in diff_and_merge(baseline, current) {
        match op {
            EditOp::Equal {
                left_line,
                right_line,
                ..
            }
            | EditOp::Replace {
                left_line,
                right_line,
                ..
            } => map[right_line - 1] = Some(left_line - 1),
            EditOp::Insert { right_line, .. } => map[right_line - 1] = None,
            EditOp::Delete { .. } => {}
        }
    }

    match signature_anchors(current, baseline) {
        Some(anchors) => {
            for (current_idx, baseline_idx) in anchors {
                if let Some(slot) = map.get_mut(current_idx) {
                    *slot = Some(baseline_idx);
                }
            }
        }
        None => tracing::debug!("signature anchors unavailable; keeping LCS line map"),
    }

    LineMap(map)
}

/// Forced `(current, baseline)` 0-based line pairs from item identity.
///
/// For each current item whose signature exists in the baseline this yields
/// the key line pair followed by up to `min(comment counts)` comment line
/// pairs at equal offsets above the key lines. Returns `None` when either
/// text has no sections.
pub fn signature_anchors<S: AsRef<str>>(
    current: &[S],
    baseline: &[S],
) -> Option<Vec<(usize, usize)>> {
    let current_doc = parse_checked(&join_lines(current)).ok()?;
    let baseline_doc = parse_checked(&join_lines(baseline)).ok()?;
    let baseline_items = baseline_doc.item_map();

    let mut anchors = Vec::new();
    for (section, item) in current_doc.items() {
        let Some(signature) = ItemSignature::new(&section.name, &item.key) else {
            continue;
        };
        let Some(baseline_item) = baseline_items.get(&signature) else {
            continue;
        };
        let (Some(current_key), Some(baseline_key)) = (
            item.line_number.and_then(|n| n.checked_sub(1)),
            baseline_item.line_number.and_then(|n| n.checked_sub(1)),
        ) else {
            continue;
        };

        anchors.push((current_key, baseline_key));

        let shared = item.comments.len().min(baseline_item.comments.len());
        for offset in 1..=shared {
            if let (Some(current_comment), Some(baseline_comment)) = (
                current_key.checked_sub(offset),
                baseline_key.checked_sub(offset),
            ) {
                anchors.push((current_comment, baseline_comment));
            }
        }
    }

    Some(anchors)
}

fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Pick the candidate whose line is closest to `anchor`.
///
/// Ties keep the first candidate encountered; without an anchor the first
/// candidate wins. Every signature-based navigation goes through here.
pub fn closest_by_line_distance<T, F>(
    candidates: &[T],
    anchor: Option<usize>,
    line_of: F,
) -> Option<&T>
where
    F: Fn(&T) -> usize,
{
    let Some(anchor) = anchor else {
        return candidates.first();
    };
    candidates
        .iter()
        .min_by_key(|candidate| line_of(*candidate).abs_diff(anchor))
}

/// Comparison row for `signature` nearest to the given left line.
pub fn find_row_by_signature<'a>(
    rows: &'a [DiffRow],
    signature: &ItemSignature,
    anchor_left_line: Option<usize>,
) -> Option<&'a DiffRow> {
    let matching = rows
        .iter()
        .filter(|row| row.signature.as_ref() == Some(signature))
        .collect::<Vec<_>>();
    closest_by_line_distance(&matching, anchor_left_line, |row| row.anchor_line()).copied()
}

/// Row to focus when jumping from live line `line`.
///
/// Uses the signature when the line has one, else the row whose left line
/// is `line`.
pub fn find_row_for_line<'a>(
    rows: &'a [DiffRow],
    signature: Option<&ItemSignature>,
    line: usize,
) -> Option<&'a DiffRow> {
    signature
        .and_then(|signature| find_row_by_signature(rows, signature, Some(line)))
        .or_else(|| rows.iter().find(|row| row.left_line == Some(line)))
}

/// 1-based live line for `signature` nearest to `anchor_line`.
///
/// An anchor of `0` means no anchor.
pub fn find_line_by_signature(
    refs: &[LineRef],
    signature: &ItemSignature,
    anchor_line: usize,
) -> Option<usize> {
    let lines = refs
        .iter()
        .enumerate()
        .filter(|(_, r)| r.signature.as_ref() == Some(signature))
        .map(|(idx, _)| idx + 1)
        .collect::<Vec<_>>();
    let anchor = (anchor_line > 0).then_some(anchor_line);
    closest_by_line_distance(&lines, anchor, |line| *line).copied()
}

/// Form field (document item) for `signature` nearest to `anchor_line`.
///
/// Falls back to every item when none carries the signature.
pub fn find_field_by_signature<'a>(
    doc: &'a Document,
    signature: &ItemSignature,
    anchor_line: Option<usize>,
) -> Option<(&'a Section, &'a Item)> {
    let all = doc.items().collect::<Vec<_>>();
    let matching = all
        .iter()
        .copied()
        .filter(|(section, item)| {
            ItemSignature::new(&section.name, &item.key).as_ref() == Some(signature)
        })
        .collect::<Vec<_>>();
    let pool = if matching.is_empty() { &all } else { &matching };
    closest_by_line_distance(pool, anchor_line, |(_, item)| {
        item.line_number.unwrap_or(0)
    })
    .copied()
}

/// Form field to show for a line that carries no signature.
///
/// The last item starting at or before `line`, else the first item after
/// it.
pub fn item_for_line(doc: &Document, line: usize) -> Option<(&Section, &Item)> {
    let mut last_at_or_before = None;
    for (section, item) in doc.items() {
        if item.line_number.unwrap_or(0) <= line {
            last_at_or_before = Some((section, item));
        } else {
            return last_at_or_before.or(Some((section, item)));
        }
    }
    last_at_or_before
}
