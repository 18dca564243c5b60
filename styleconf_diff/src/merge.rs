use std::collections::BTreeSet;

use styleconf_ir::{Document, ItemSignature, parse};

use crate::model::{MergeCandidate, MergeOptions, RewriteOutcome, Side};
use crate::rewrite::apply_value_only;

/// Items that disagree between `new_doc` and `old_doc`.
///
/// Signatures present on both sides with equal values are skipped.
/// Candidates are sorted by `(section_name, key)` as stored.
pub fn build_merge_candidates(new_doc: &Document, old_doc: &Document) -> Vec<MergeCandidate> {
    let new_items = new_doc.item_map();
    let old_items = old_doc.item_map();
    let signatures = new_items
        .keys()
        .chain(old_items.keys())
        .collect::<BTreeSet<_>>();

    let mut candidates = Vec::new();
    for signature in signatures {
        let new_item = new_items.get(signature);
        let old_item = old_items.get(signature);
        if let (Some(n), Some(o)) = (new_item, old_item)
            && n.value == o.value
        {
            continue;
        }

        let Some(info) = new_item.or(old_item) else {
            continue;
        };
        candidates.push(MergeCandidate {
            signature: signature.clone(),
            section_name: info.section_name.clone(),
            key: info.key.clone(),
            new_item: new_item.cloned(),
            old_item: old_item.cloned(),
            prefer_new: new_item.is_some(),
        });
    }

    candidates.sort_by(|a, b| (&a.section_name, &a.key).cmp(&(&b.section_name, &b.key)));
    candidates
}

/// Set every candidate to the same side.
pub fn set_all_choices(candidates: &mut [MergeCandidate], prefer_new: bool) {
    for candidate in candidates {
        candidate.prefer_new = prefer_new;
    }
}

/// Apply [`MergeOptions::prefer`] to every candidate.
pub fn apply_preference(candidates: &mut [MergeCandidate], options: &MergeOptions) {
    set_all_choices(candidates, options.prefer == Side::New);
}

/// Set one candidate's side by signature; returns whether it was found.
pub fn choose(candidates: &mut [MergeCandidate], signature: &ItemSignature, side: Side) -> bool {
    match candidates.iter_mut().find(|c| &c.signature == signature) {
        Some(candidate) => {
            candidate.prefer_new = side == Side::New;
            true
        }
        None => false,
    }
}

/// Write the selected side of every candidate into a copy of `new_doc`.
///
/// A missing selected item falls back to the other side only when
/// `use_other_when_missing` is set; otherwise the target is left untouched.
/// Sections left empty are pruned.
pub fn apply_merge_selections(
    new_doc: &Document,
    candidates: &[MergeCandidate],
    use_other_when_missing: bool,
) -> Document {
    let mut merged = new_doc.clone();

    for candidate in candidates {
        let chosen = match (candidate.selected(), candidate.other()) {
            (Some(selected), _) => Some(selected),
            (None, Some(other)) if use_other_when_missing => Some(other),
            _ => None,
        };
        if let Some(item) = chosen {
            merged.set_item(
                &candidate.section_name,
                &candidate.key,
                &item.value,
                &item.comments,
            );
        }
    }

    merged.remove_empty_sections();
    merged
}

/// Merge candidates into `new_text`, keeping its formatting when only
/// values changed.
pub fn merge_texts(
    new_text: &str,
    candidates: &[MergeCandidate],
    use_other_when_missing: bool,
) -> RewriteOutcome {
    let before = parse(new_text);
    let after = apply_merge_selections(&before, candidates, use_other_when_missing);
    let outcome = apply_value_only(new_text, &before, &after);
    tracing::debug!(
        candidates = candidates.len(),
        structural = outcome.used_structural_rewrite,
        "applied merge selections"
    );
    outcome
}

/// Description shown for a candidate, built from both sides' comments.
pub fn merge_description(candidate: &MergeCandidate) -> String {
    let new_description = candidate
        .new_item
        .as_ref()
        .map(|item| item.description())
        .unwrap_or_default();
    let old_description = candidate
        .old_item
        .as_ref()
        .map(|item| item.description())
        .unwrap_or_default();

    match (new_description.is_empty(), old_description.is_empty()) {
        (false, false) if new_description == old_description => new_description,
        (false, false) => format!("New: {new_description}\nOld: {old_description}"),
        (false, true) => new_description,
        _ => old_description,
    }
}
