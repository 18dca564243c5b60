use std::fs;
use std::path::Path;

use serde::Deserialize;
use styleconf_diff::{
    MergeOptions, Side, apply_preference, build_merge_candidates, choose, merge_texts,
};
use styleconf_ir::{ItemSignature, parse_checked};

#[derive(Debug, Deserialize)]
struct Fixture {
    name: String,
    new: String,
    old: String,
    #[serde(default)]
    options: MergeOptions,
    #[serde(default)]
    choices: Vec<Choice>,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct Choice {
    signature: ItemSignature,
    side: Side,
}

#[derive(Debug, Deserialize)]
struct Expected {
    candidates: Vec<String>,
    structural: bool,
    #[serde(default)]
    merged: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let fixtures_dir = repo_root.join("fixtures");

    let mut entries = fs::read_dir(&fixtures_dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.path());

    let mut checked = 0usize;
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let raw = fs::read_to_string(&path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;

        let new_doc = parse_checked(&fixture.new)?;
        let old_doc = parse_checked(&fixture.old)?;
        let mut candidates = build_merge_candidates(&new_doc, &old_doc);

        let signatures = candidates
            .iter()
            .map(|c| c.signature.to_string())
            .collect::<Vec<_>>();
        if signatures != fixture.expected.candidates {
            return Err(format!(
                "fixture {}: candidates mismatch: expected {:?}, got {:?}",
                fixture.name, fixture.expected.candidates, signatures
            )
            .into());
        }

        apply_preference(&mut candidates, &fixture.options);
        for choice in &fixture.choices {
            if !choose(&mut candidates, &choice.signature, choice.side) {
                return Err(format!(
                    "fixture {}: no candidate for choice {}",
                    fixture.name, choice.signature
                )
                .into());
            }
        }

        let outcome = merge_texts(
            &fixture.new,
            &candidates,
            fixture.options.use_other_when_missing,
        );
        if outcome.used_structural_rewrite != fixture.expected.structural {
            return Err(format!(
                "fixture {}: structural mismatch: expected {}, got {}",
                fixture.name, fixture.expected.structural, outcome.used_structural_rewrite
            )
            .into());
        }

        if let Some(merged) = &fixture.expected.merged
            && *merged != outcome.text
        {
            return Err(format!(
                "fixture {}: merged text mismatch: expected {:?}, got {:?}",
                fixture.name, merged, outcome.text
            )
            .into());
        }

        checked += 1;
    }

    println!("replayed {checked} fixture(s)");
    Ok(())
}

