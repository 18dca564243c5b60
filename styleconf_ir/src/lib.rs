//! Document model, parser and serializer for `style.conf` text.
//!
//! This crate provides:
//! - a structured model (`Document`, `Section`, `Item`)
//! - a total parser (`parse`) and its validating wrapper (`parse_checked`)
//! - the canonical full-rewrite serializer (`Document::render`)
//! - item identity (`ItemSignature`) and per-line references (`LineRef`)
//!
//! The parser never fails. Lines that are neither blank, comment, section
//! header nor a valid `key=value` are skipped and discard any pending
//! comment run. A document without sections is only rejected by
//! [`parse_checked`].
//!
//! # Example
//!
//! ```rust
//! use styleconf_ir::parse;
//!
//! let doc = parse("[Colors]\n; accent color\nAccent=ff0000\n");
//! assert_eq!(doc.sections[0].items[0].comments, vec!["accent color"]);
//! assert_eq!(doc.render(), "[Colors]\n; accent color\nAccent=ff0000");
//! ```

mod signature;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use signature::{ItemEntry, ItemMap, ItemSignature, LineRef, build_line_refs};

/// One `key=value` setting with the comment run preceding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub value: String,
    pub comments: Vec<String>,
    /// 1-based source line of the key line; `None` for items created by mutation.
    pub line_number: Option<usize>,
}

impl Item {
    /// Create an item that does not originate from a parse.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comments: Vec::new(),
            line_number: None,
        }
    }

    /// Attach a comment run.
    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    /// Comments joined by newlines and trimmed, used as a human description.
    pub fn description(&self) -> String {
        self.comments.join("\n").trim().to_string()
    }
}

/// A `[name]` block and its items in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<Item>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn item(&self, key: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.key == key)
    }
}

/// Parsed `style.conf` document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Raw lines before the first section header, kept verbatim.
    pub header_lines: Vec<String>,
    pub sections: Vec<Section>,
}

/// Validation failure for parse results that callers must check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No section found. Please check style.conf format.")]
    NoSections,
}

impl Document {
    /// First section with exactly this name.
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    fn find_section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|section| section.name == name)
    }

    /// Look up an item by exact section name and key.
    pub fn item(&self, section: &str, key: &str) -> Option<&Item> {
        self.find_section(section).and_then(|s| s.item(key))
    }

    /// Write `value` and `comments` for `(section, key)`.
    ///
    /// Creates the section when absent, replaces value and comments of an
    /// existing item, and appends a new item otherwise.
    pub fn set_item(&mut self, section: &str, key: &str, value: &str, comments: &[String]) {
        if self.find_section(section).is_none() {
            self.sections.push(Section::new(section));
        }
        let Some(target) = self.find_section_mut(section) else {
            return;
        };

        if let Some(existing) = target.items.iter_mut().find(|item| item.key == key) {
            existing.value = value.to_string();
            existing.comments = comments.to_vec();
            return;
        }

        target
            .items
            .push(Item::new(key, value).with_comments(comments.to_vec()));
    }

    /// Remove every item with `key` from the first section named `section`.
    pub fn remove_item(&mut self, section: &str, key: &str) {
        if let Some(target) = self.find_section_mut(section) {
            target.items.retain(|item| item.key != key);
        }
    }

    /// Drop sections that have no items left.
    pub fn remove_empty_sections(&mut self) {
        self.sections.retain(|section| !section.items.is_empty());
    }

    /// Iterate `(section, item)` pairs in document order.
    pub fn items(&self) -> impl Iterator<Item = (&Section, &Item)> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter().map(move |item| (section, item)))
    }

    /// Reject documents that contain no section.
    pub fn validate(self) -> Result<Self, ParseError> {
        if self.sections.is_empty() {
            Err(ParseError::NoSections)
        } else {
            Ok(self)
        }
    }

    /// Canonical full-rewrite serialization.
    ///
    /// Header lines are emitted verbatim, followed by a blank line when the
    /// last one is non-blank. Sections are separated by one blank line and
    /// the output has no trailing newline.
    pub fn render(&self) -> String {
        let mut out: Vec<String> = Vec::new();

        if let Some(last) = self.header_lines.last() {
            out.extend(self.header_lines.iter().cloned());
            if !last.trim().is_empty() {
                out.push(String::new());
            }
        }

        for (idx, section) in self.sections.iter().enumerate() {
            out.push(format!("[{}]", section.name));
            for item in &section.items {
                for comment in &item.comments {
                    out.push(format!("; {comment}").trim_end().to_string());
                }
                out.push(format!("{}={}", item.key, item.value));
            }
            if idx + 1 < self.sections.len() {
                out.push(String::new());
            }
        }

        out.join("\n")
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Split text into lines after dropping a leading UTF-8 BOM and normalizing
/// `\r\n` to `\n`.
///
/// Always yields at least one (possibly empty) line.
pub fn split_lines(input: &str) -> Vec<String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    input
        .replace("\r\n", "\n")
        .split('\n')
        .map(ToString::to_string)
        .collect()
}

/// Parse `style.conf` text. Never fails; see [`parse_checked`].
pub fn parse(input: &str) -> Document {
    let mut doc = Document::default();
    let mut pending_comments: Vec<String> = Vec::new();
    let mut first_section_seen = false;

    for (idx, raw) in split_lines(input).into_iter().enumerate() {
        let line = raw.trim();

        if !first_section_seen {
            if section_header_name(line).is_some() {
                first_section_seen = true;
            } else {
                doc.header_lines.push(raw);
                continue;
            }
        }

        if line.is_empty() {
            pending_comments.clear();
            continue;
        }

        if let Some(name) = section_header_name(line) {
            doc.sections.push(Section::new(name));
            pending_comments.clear();
            continue;
        }

        if let Some(comment) = comment_text(line) {
            pending_comments.push(comment.to_string());
            continue;
        }

        let committed = match (split_key_value(&raw), doc.sections.last_mut()) {
            (Some((key, value)), Some(section)) => {
                section.items.push(Item {
                    key: key.to_string(),
                    value: value.to_string(),
                    comments: std::mem::take(&mut pending_comments),
                    line_number: Some(idx + 1),
                });
                true
            }
            _ => false,
        };
        if !committed {
            pending_comments.clear();
        }
    }

    doc
}

/// Parse and reject documents without sections.
pub fn parse_checked(input: &str) -> Result<Document, ParseError> {
    parse(input).validate()
}

/// Inner name of a trimmed `[name]` line (`^\[([^\]]+)\]$`).
pub fn section_header_name(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || inner.contains(']') {
        None
    } else {
        Some(inner)
    }
}

// `^;\s?(.*)$` on a trimmed line.
fn comment_text(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix(';')?;
    let mut chars = rest.chars();
    match chars.next() {
        Some(ch) if ch.is_whitespace() => Some(chars.as_str()),
        _ => Some(rest),
    }
}

/// Split a raw line at its first `=` into trimmed key and value.
///
/// Returns `None` when there is no `=`, when it is the first byte, or when
/// the trimmed key is empty.
pub fn split_key_value(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find('=')?;
    if idx == 0 {
        return None;
    }
    let key = raw[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, raw[idx + 1..].trim()))
}
