use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use styleconf_ir::{Document, split_lines};

use crate::model::RewriteOutcome;

/// Rewrite `original` so it reflects `after`, patching value segments in
/// place when the only differences from `before` are item values.
///
/// Any signature present on one side only, a key line outside the text, or
/// a key line that no longer reads `key = value` makes the whole operation
/// fall back to a full [`Document::render`] of `after`.
pub fn apply_value_only(original: &str, before: &Document, after: &Document) -> RewriteOutcome {
    let before_items = before.item_map();
    let after_items = after.item_map();
    let mut lines = split_lines(original);

    let signatures = before_items
        .keys()
        .chain(after_items.keys())
        .collect::<BTreeSet<_>>();

    for signature in signatures {
        let (Some(before_item), Some(after_item)) =
            (before_items.get(signature), after_items.get(signature))
        else {
            tracing::debug!(%signature, "item added or removed; using structural rewrite");
            return structural(after);
        };

        if before_item.value == after_item.value {
            continue;
        }

        let Some(idx) = before_item
            .line_number
            .and_then(|n| n.checked_sub(1))
            .filter(|idx| *idx < lines.len())
        else {
            tracing::debug!(%signature, "key line out of range; using structural rewrite");
            return structural(after);
        };

        let Some(patched) = replace_value(&lines[idx], &before_item.key, &after_item.value) else {
            tracing::debug!(
                %signature,
                line = idx + 1,
                "key line does not match; using structural rewrite"
            );
            return structural(after);
        };
        lines[idx] = patched;
    }

    RewriteOutcome {
        text: lines.join("\n"),
        used_structural_rewrite: false,
    }
}

/// Write a single edited value back to its key line.
///
/// A line that no longer matches `key = value` is replaced by `key=value`.
/// Text is returned unchanged when `line_number` does not point into it.
pub fn patch_item_line(text: &str, key: &str, value: &str, line_number: Option<usize>) -> String {
    let mut lines = split_lines(text);
    let Some(idx) = line_number
        .and_then(|n| n.checked_sub(1))
        .filter(|idx| *idx < lines.len())
    else {
        return text.to_string();
    };

    lines[idx] =
        replace_value(&lines[idx], key, value).unwrap_or_else(|| format!("{key}={value}"));
    lines.join("\n")
}

/// Splice `value` into `line` between its `key =` prefix and trailing
/// whitespace, or `None` when the line is not an assignment of `key`.
pub fn replace_value(line: &str, key: &str, value: &str) -> Option<String> {
    let pattern = VALUE_LINE.as_ref().ok()?;
    let caps = pattern.captures(line)?;
    if caps.get(2).map(|m| m.as_str()) != Some(key) {
        return None;
    }
    let value_start = caps.get(4).map(|m| m.start())?;
    let suffix = caps.get(5).map_or("", |m| m.as_str());
    Some(format!("{}{value}{suffix}", &line[..value_start]))
}

// Keys never contain `=`, so the lazy key group stops at the first one.
static VALUE_LINE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(\s*)([^=]*?)(\s*=\s*)(.*?)(\s*)$"));

fn structural(after: &Document) -> RewriteOutcome {
    RewriteOutcome {
        text: after.render(),
        used_structural_rewrite: true,
    }
}
