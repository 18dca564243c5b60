use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Document, section_header_name, split_key_value};

/// Case- and whitespace-insensitive identity of a `(section, key)` pair.
///
/// Two items are the same logical setting iff their signatures are equal,
/// independent of source line, comments, or surrounding formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSignature(String);

impl ItemSignature {
    /// Build `lower(trim(section))::lower(trim(key))`.
    ///
    /// Returns `None` when the trimmed key is empty.
    pub fn new(section_name: &str, key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        let section = section_name.trim().to_lowercase();
        Some(Self(format!("{section}::{key}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flattened item snapshot keyed by signature in an [`ItemMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub section_name: String,
    pub key: String,
    pub value: String,
    pub comments: Vec<String>,
    pub line_number: Option<usize>,
}

impl ItemEntry {
    pub fn description(&self) -> String {
        self.comments.join("\n").trim().to_string()
    }
}

/// Ordered signature index over every item of a document.
pub type ItemMap = BTreeMap<ItemSignature, ItemEntry>;

impl Document {
    /// Index items by signature; a later duplicate overwrites an earlier one.
    pub fn item_map(&self) -> ItemMap {
        let mut map = ItemMap::new();
        for (section, item) in self.items() {
            let Some(signature) = ItemSignature::new(&section.name, &item.key) else {
                continue;
            };
            map.insert(
                signature,
                ItemEntry {
                    section_name: section.name.clone(),
                    key: item.key.clone(),
                    value: item.value.clone(),
                    comments: item.comments.clone(),
                    line_number: item.line_number,
                },
            );
        }
        map
    }
}

/// Section context and item identity of a single raw line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LineRef {
    pub section_name: String,
    /// Empty for blank, comment, header and non key lines.
    pub item_key: String,
    pub signature: Option<ItemSignature>,
}

/// Compute a [`LineRef`] for every line without building a document.
///
/// A header line switches the running section (trimmed name) for itself and
/// all following lines.
pub fn build_line_refs<S: AsRef<str>>(lines: &[S]) -> Vec<LineRef> {
    let mut current_section = String::new();
    let mut refs = Vec::with_capacity(lines.len());

    for line in lines {
        let raw = line.as_ref();
        let trimmed = raw.trim();

        let mut item_key = String::new();
        if let Some(name) = section_header_name(trimmed) {
            current_section = name.trim().to_string();
        } else if !trimmed.is_empty()
            && !trimmed.starts_with(';')
            && let Some((key, _)) = split_key_value(raw)
        {
            item_key = key.to_string();
        }

        let signature = ItemSignature::new(&current_section, &item_key);
        refs.push(LineRef {
            section_name: current_section.clone(),
            item_key,
            signature,
        });
    }

    refs
}
