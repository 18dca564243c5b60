use std::time::{Duration, Instant};

use styleconf_ir::{ItemSignature, ParseError, parse};

use super::{
    DiffStats, EditOp, EditSession, ImportOptions, LineMap, RowKind, SessionError,
    apply_merge_selections, apply_value_only, build_diff_rows, build_line_map,
    build_merge_candidates, diff_and_merge, find_row_by_signature, merge_description, merge_texts,
    set_all_choices,
};

fn lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

#[test]
fn replace_merging_pairs_single_line_change() {
    let ops = diff_and_merge(&lines("a\nb\nc"), &lines("a\nx\nc"));

    assert_eq!(ops.len(), 3);
    assert!(matches!(&ops[0], EditOp::Equal { left_text, .. } if left_text == "a"));
    assert_eq!(
        ops[1],
        EditOp::Replace {
            left_text: "b".to_string(),
            right_text: "x".to_string(),
            left_line: 2,
            right_line: 2,
        }
    );
    assert!(matches!(&ops[2], EditOp::Equal { right_text, .. } if right_text == "c"));
}

#[test]
fn stats_count_merged_operations() {
    let ops = diff_and_merge(&lines("a\nb\nc\nd"), &lines("a\nx\nc"));
    let stats = DiffStats::from_ops(&ops);

    assert_eq!(stats.equal, 2);
    assert_eq!(stats.replaces, 1);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.inserts, 0);
    assert!(stats.has_changes());
    assert!(!DiffStats::from_ops(&diff_and_merge(&lines("a"), &lines("a"))).has_changes());
}

#[test]
fn value_only_patch_touches_one_line() {
    let original = "[A]\nfoo=1\n[B]\nbar=2\n";
    let before = parse(original);
    let mut after = before.clone();
    after.set_item("A", "foo", "9", &[]);

    let outcome = apply_value_only(original, &before, &after);
    assert_eq!(outcome.text, "[A]\nfoo=9\n[B]\nbar=2\n");
    assert!(!outcome.used_structural_rewrite);
}

#[test]
fn added_item_forces_structural_rewrite() {
    let original = "[A]\n  foo = 1\n";
    let before = parse(original);
    let mut after = before.clone();
    after.set_item("A", "bar", "2", &[]);

    let outcome = apply_value_only(original, &before, &after);
    assert!(outcome.used_structural_rewrite);
    assert_eq!(outcome.text, "[A]\nfoo=1\nbar=2");
}

#[test]
fn key_line_past_end_of_text_forces_structural_rewrite() {
    let before = parse("[A]\nfoo=1");
    let mut after = before.clone();
    after.set_item("A", "foo", "2", &[]);

    let outcome = apply_value_only("[A]", &before, &after);
    assert!(outcome.used_structural_rewrite);
    assert_eq!(outcome.text, after.render());
    assert_eq!(outcome.text, "[A]\nfoo=2");
}

#[test]
fn key_line_turned_comment_forces_structural_rewrite() {
    let before = parse("[A]\nfoo=1");
    let mut after = before.clone();
    after.set_item("A", "foo", "2", &[]);

    let outcome = apply_value_only("[A]\n; foo=1", &before, &after);
    assert!(outcome.used_structural_rewrite);
    assert_eq!(outcome.text, after.render());
    assert_eq!(outcome.text, "[A]\nfoo=2");
}

#[test]
fn edited_item_reports_baseline_value() {
    let mut session = EditSession::load("[A]\n; desc\nfoo=0\n").expect("load baseline");
    session
        .import_text(
            "[A]\n; desc\nfoo=1\n",
            ImportOptions::default().keep_source_text(true),
        )
        .expect("import");

    assert!(session.is_item_edited("A", "foo"));
    assert_eq!(session.baseline_value("A", "foo"), Some("0"));
    assert!(!session.is_item_edited("A", "missing"));
}

#[test]
fn item_absent_from_baseline_is_not_edited() {
    let mut session = EditSession::load("[A]\nfoo=1\n").expect("load baseline");
    session
        .import_text(
            "[A]\nfoo=1\nbar=2\n",
            ImportOptions::default().keep_source_text(true),
        )
        .expect("import");

    assert!(!session.is_item_edited("A", "bar"));
    assert_eq!(session.baseline_value("A", "bar"), None);
}

#[test]
fn candidate_for_missing_old_section() {
    let new_doc = parse("[A]\nfoo=1\n");
    let old_doc = parse("[B]\nbar=2\n");

    let candidates = build_merge_candidates(&new_doc, &old_doc);
    assert_eq!(candidates.len(), 2);

    let first = &candidates[0];
    assert_eq!(first.section_name, "A");
    assert_eq!(first.key, "foo");
    assert_eq!(
        first.new_item.as_ref().map(|item| item.value.as_str()),
        Some("1")
    );
    assert!(first.old_item.is_none());
    assert!(first.prefer_new);

    assert_eq!(candidates[1].key, "bar");
    assert!(!candidates[1].prefer_new);
}

#[test]
fn identical_documents_have_no_candidates() {
    let doc = parse("[A]\n; note\nfoo=1\n[B]\nbar=2\n");
    assert!(build_merge_candidates(&doc, &doc).is_empty());
}

#[test]
fn missing_selection_uses_other_side_only_when_enabled() {
    let new_doc = parse("[A]\nfoo=1\n");
    let old_doc = parse("[A]\nfoo=1\n[B]\n; from old\nbar=2\n");
    let mut candidates = build_merge_candidates(&new_doc, &old_doc);
    set_all_choices(&mut candidates, true);

    let untouched = apply_merge_selections(&new_doc, &candidates, false);
    assert_eq!(untouched, new_doc);

    let filled = apply_merge_selections(&new_doc, &candidates, true);
    let bar = filled.item("B", "bar").expect("bar merged");
    assert_eq!(bar.value, "2");
    assert_eq!(bar.comments, vec!["from old"]);
}

#[test]
fn merging_old_value_keeps_formatting() {
    let new_text = "[Colors]\n; accent\n  Accent = ff0000   \n";
    let old_text = "[Colors]\nAccent=00ff00\n";
    let mut candidates = build_merge_candidates(&parse(new_text), &parse(old_text));
    set_all_choices(&mut candidates, false);

    let outcome = merge_texts(new_text, &candidates, false);
    assert!(!outcome.used_structural_rewrite);
    assert_eq!(outcome.text, "[Colors]\n; accent\n  Accent = 00ff00   \n");
}

#[test]
fn merge_description_combines_different_comments() {
    let new_doc = parse("[A]\n; new note\nfoo=1\n");
    let old_doc = parse("[A]\n; old note\nfoo=2\n");
    let candidates = build_merge_candidates(&new_doc, &old_doc);
    assert_eq!(
        merge_description(&candidates[0]),
        "New: new note\nOld: old note"
    );

    let same = build_merge_candidates(
        &parse("[A]\n; note\nfoo=1\n"),
        &parse("[A]\n; note\nfoo=2\n"),
    );
    assert_eq!(merge_description(&same[0]), "note");
}

#[test]
fn moved_items_map_by_signature() {
    let baseline = lines("[A]\nfoo=1\nbar=2");
    let current = lines("[A]\nbar=2\nfoo=1");

    let map = build_line_map(&current, &baseline);
    assert_eq!(map, LineMap(vec![Some(0), Some(2), Some(1)]));
}

#[test]
fn signature_anchor_overrides_comment_alignment() {
    let baseline = lines("[A]\n; accent\nfoo=1\n");
    let current = lines("[A]\nfoo=2\n");

    let map = build_line_map(&current, &baseline);
    assert_eq!(map, LineMap(vec![Some(0), Some(2), Some(3)]));
}

#[test]
fn duplicate_signatures_anchor_to_last_baseline_occurrence() {
    let text = lines("[M]\nkey=a\n[M]\nkey=b");

    let map = build_line_map(&text, &text);
    assert_eq!(map, LineMap(vec![Some(0), Some(3), Some(2), Some(3)]));
}

#[test]
fn line_map_without_sections_keeps_lcs_alignment() {
    let baseline = lines("x\ny");
    let current = lines("x\nz\ny");

    let map = build_line_map(&current, &baseline);
    assert_eq!(map, LineMap(vec![Some(0), None, Some(1)]));
}

#[test]
fn changed_lines_place_removed_baseline_lines() {
    let mut session = EditSession::load("[A]\nfoo=1\nbar=2").expect("load baseline");
    session
        .import_text("[A]\nfoo=3", ImportOptions::default().keep_source_text(true))
        .expect("import");

    let changed = session.changed_lines();
    assert_eq!(changed.len(), 2);
    assert_eq!(changed[0].line_number, 2);
    assert_eq!(changed[0].before, "foo=1");
    assert_eq!(changed[0].after, "foo=3");
    assert_eq!(changed[1].line_number, 3);
    assert_eq!(changed[1].before, "bar=2");
    assert_eq!(changed[1].after, "");
}

#[test]
fn unchanged_text_has_no_changed_lines() {
    let session = EditSession::load("[A]\n; c\nfoo=1\n").expect("load");
    assert!(session.changed_lines().is_empty());
    assert!(session.line_states().iter().all(|state| !state.edited));
}

#[test]
fn line_descriptions_fall_back_to_baseline_comments() {
    let mut session = EditSession::load("[A]\n; accent\nfoo=1\n").expect("load baseline");
    session
        .import_text("[A]\nfoo=2\n", ImportOptions::default().keep_source_text(true))
        .expect("import");

    let descriptions = session.line_descriptions();
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions.get(&2).map(String::as_str), Some("accent"));
}

#[test]
fn edited_key_line_can_be_reset() {
    let mut session = EditSession::load("[A]\nfoo=1\nbar=2").expect("load");
    assert_eq!(session.set_item_value("A", "foo", "5"), Ok(true));
    assert_eq!(session.source_text(), "[A]\nfoo=5\nbar=2");
    assert!(session.is_item_edited("A", "foo"));

    let states = session.line_states();
    assert!(states[1].edited);
    assert!(states[1].can_reset);
    assert_eq!(states[1].baseline_text, "foo=1");
    assert!(!states[2].edited);
    assert!(!states[0].can_reset);

    assert_eq!(session.reset_line_to_baseline(2), Ok(true));
    assert_eq!(session.source_text(), "[A]\nfoo=1\nbar=2");
    assert_eq!(session.reset_line_to_baseline(2), Ok(false));
    assert_eq!(session.reset_line_to_baseline(0), Ok(false));
    assert!(!session.is_item_edited("A", "foo"));
}

#[test]
fn item_reset_patches_key_line() {
    let mut session = EditSession::load("[A]\n  foo = 1\n").expect("load");
    assert_eq!(session.set_item_value("A", "foo", "7"), Ok(true));
    assert_eq!(session.source_text(), "[A]\n  foo = 7\n");

    assert_eq!(session.reset_item_to_baseline("A", "foo"), Ok(true));
    assert_eq!(session.source_text(), "[A]\n  foo = 1\n");
    assert_eq!(session.reset_item_to_baseline("A", "foo"), Ok(false));
    assert_eq!(session.set_item_value("A", "missing", "1"), Ok(false));
}

#[test]
fn import_failure_leaves_state_untouched() {
    let mut session = EditSession::load("[A]\nfoo=1\n").expect("load");
    let err = session
        .import_text("no sections here", ImportOptions::default())
        .expect_err("rejected");

    assert_eq!(err, ParseError::NoSections);
    assert_eq!(session.source_text(), "[A]\nfoo=1\n");
    assert_eq!(
        err.to_string(),
        "No section found. Please check style.conf format."
    );
}

#[test]
fn import_without_keep_source_renders_document() {
    let mut session = EditSession::default();
    session
        .import_text(
            "[A]\n  foo = 1  \n\n\n[B]\nbar=2\n",
            ImportOptions::default().set_as_baseline(true),
        )
        .expect("import");

    assert_eq!(session.source_text(), "[A]\nfoo=1\n\n[B]\nbar=2");
    assert_eq!(session.baseline().text(), "[A]\n  foo = 1  \n\n\n[B]\nbar=2\n");
}

#[test]
fn comparison_requires_old_revision() {
    let mut session = EditSession::load("[A]\nfoo=1\n").expect("load");
    assert_eq!(session.diff_rows(), Err(SessionError::NoComparison));
    assert_eq!(session.merge_candidates(), Err(SessionError::NoComparison));
    assert_eq!(
        session.apply_merge(&[], false),
        Err(SessionError::NoComparison)
    );

    session.set_old(Some("old.conf".to_string()), "garbage");
    assert_eq!(
        session.merge_candidates(),
        Err(SessionError::Parse(ParseError::NoSections))
    );

    session.clear_old();
    assert!(session.old().is_none());
}

#[test]
fn session_merge_rewrites_live_text() {
    let mut session = EditSession::load("[A]\nfoo=1\n").expect("load");
    session.set_old(None, "[A]\nfoo=2\n");

    let mut candidates = session.merge_candidates().expect("candidates");
    assert_eq!(candidates.len(), 1);
    set_all_choices(&mut candidates, false);

    let outcome = session.apply_merge(&candidates, false).expect("merge");
    assert!(!outcome.used_structural_rewrite);
    assert_eq!(session.source_text(), "[A]\nfoo=2\n");
    assert_eq!(
        session.document().item("A", "foo").map(|item| item.value.as_str()),
        Some("2")
    );
    assert!(session.is_item_edited("A", "foo"));
}

#[test]
fn diff_rows_carry_signatures_from_either_side() {
    let live = lines("[A]\nfoo=1");
    let old = lines("[A]\nfoo=2\nbar=3");

    let rows = build_diff_rows(&live, &old);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].kind, RowKind::Same);
    assert_eq!(rows[1].kind, RowKind::Changed);
    assert_eq!(rows[1].title, "Left: foo=1");
    assert_eq!(rows[1].signature, ItemSignature::new("A", "foo"));
    assert_eq!(rows[2].kind, RowKind::Added);
    assert_eq!(rows[2].title, "Only in old file");
    assert_eq!(rows[2].left_line, None);

    let bar = ItemSignature::new("a", "BAR").expect("signature");
    let row = find_row_by_signature(&rows, &bar, None).expect("bar row");
    assert_eq!(row.right_line, Some(3));
}

#[test]
fn deferred_reparse_fires_after_quiet_period() {
    let start = Instant::now();
    let mut session = EditSession::load("[A]\nfoo=1").expect("load");

    session.on_text_input("[A]\nfoo=2", start);
    let early = session.poll(start + Duration::from_millis(50));
    assert!(!early.reparsed);
    assert!(!early.history_commit_due);
    assert_eq!(
        session.document().item("A", "foo").map(|item| item.value.as_str()),
        Some("1")
    );

    let reparse = session.poll(start + Duration::from_millis(130));
    assert!(reparse.reparsed);
    assert_eq!(reparse.parse_error, None);
    assert!(!reparse.history_commit_due);
    assert_eq!(
        session.document().item("A", "foo").map(|item| item.value.as_str()),
        Some("2")
    );

    let commit = session.poll(start + Duration::from_millis(170));
    assert!(!commit.reparsed);
    assert!(commit.history_commit_due);
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn rejected_deferred_reparse_keeps_document() {
    let start = Instant::now();
    let mut session = EditSession::load("[A]\nfoo=1").expect("load");

    session.on_text_input("garbage", start);
    let outcome = session.poll(start + Duration::from_millis(200));

    assert!(outcome.reparsed);
    assert_eq!(outcome.parse_error, Some(ParseError::NoSections));
    assert!(outcome.history_commit_due);
    assert_eq!(session.source_text(), "garbage");
    assert!(session.document().item("A", "foo").is_some());
}

#[test]
fn programmatic_edits_do_not_arm_timers() {
    let mut session = EditSession::load("[A]\nfoo=1").expect("load");
    assert_eq!(session.set_item_value("A", "foo", "2"), Ok(true));
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn session_line_refs_follow_live_text() {
    let mut session = EditSession::load("[A]\nfoo=1").expect("load");
    session.on_text_input("[A]\nfoo=1\n[B]\nbar=2", Instant::now());

    let refs = session.line_refs();
    assert_eq!(refs.len(), 4);
    assert_eq!(refs[1].signature, ItemSignature::new("A", "foo"));
    assert_eq!(refs[3].signature, ItemSignature::new("B", "bar"));
}
