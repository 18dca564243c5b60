use styleconf_ir::{ItemSignature, LineRef, build_line_refs};
use xxhash_rust::xxh3::xxh3_64;

use crate::model::{DiffRow, EditOp, RowKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Compute the LCS edit script turning `left` into `right`.
///
/// Lines are compared through their xxh3 content token. On a tie between
/// insert and delete the walk prefers insert.
pub fn diff_lines<S: AsRef<str>>(left: &[S], right: &[S]) -> Vec<EditOp> {
    let left_tokens = left.iter().map(line_token).collect::<Vec<_>>();
    let right_tokens = right.iter().map(line_token).collect::<Vec<_>>();
    let ops = compute_ops(&left_tokens, &right_tokens);

    let mut out = Vec::with_capacity(ops.len());
    let mut i = 0usize;
    let mut j = 0usize;
    for op in ops {
        match op {
            Op::Equal => {
                out.push(EditOp::Equal {
                    left_text: left[i].as_ref().to_string(),
                    right_text: right[j].as_ref().to_string(),
                    left_line: i + 1,
                    right_line: j + 1,
                });
                i += 1;
                j += 1;
            }
            Op::Insert => {
                out.push(EditOp::Insert {
                    right_text: right[j].as_ref().to_string(),
                    right_line: j + 1,
                });
                j += 1;
            }
            Op::Delete => {
                out.push(EditOp::Delete {
                    left_text: left[i].as_ref().to_string(),
                    left_line: i + 1,
                });
                i += 1;
            }
        }
    }

    tracing::trace!(
        left = left.len(),
        right = right.len(),
        ops = out.len(),
        "computed line edit script"
    );
    out
}

/// Pair up deletes and inserts of each contiguous change run as replaces.
///
/// Within a run the first `min(deletes, inserts)` pairs become
/// [`EditOp::Replace`] by position; surplus deletes follow, then surplus
/// inserts.
pub fn merge_replaces(ops: Vec<EditOp>) -> Vec<EditOp> {
    let mut merged = Vec::with_capacity(ops.len());
    let mut deletes: Vec<(String, usize)> = Vec::new();
    let mut inserts: Vec<(String, usize)> = Vec::new();

    for op in ops {
        match op {
            EditOp::Delete {
                left_text,
                left_line,
            } => deletes.push((left_text, left_line)),
            EditOp::Insert {
                right_text,
                right_line,
            } => inserts.push((right_text, right_line)),
            other => {
                flush_run(&mut merged, &mut deletes, &mut inserts);
                merged.push(other);
            }
        }
    }
    flush_run(&mut merged, &mut deletes, &mut inserts);

    merged
}

fn flush_run(
    out: &mut Vec<EditOp>,
    deletes: &mut Vec<(String, usize)>,
    inserts: &mut Vec<(String, usize)>,
) {
    let paired = deletes.len().min(inserts.len());
    let mut deletes = std::mem::take(deletes).into_iter();
    let mut inserts = std::mem::take(inserts).into_iter();

    for ((left_text, left_line), (right_text, right_line)) in
        deletes.by_ref().zip(inserts.by_ref()).take(paired)
    {
        out.push(EditOp::Replace {
            left_text,
            right_text,
            left_line,
            right_line,
        });
    }
    out.extend(deletes.map(|(left_text, left_line)| EditOp::Delete {
        left_text,
        left_line,
    }));
    out.extend(inserts.map(|(right_text, right_line)| EditOp::Insert {
        right_text,
        right_line,
    }));
}

/// [`diff_lines`] followed by [`merge_replaces`].
pub fn diff_and_merge<S: AsRef<str>>(left: &[S], right: &[S]) -> Vec<EditOp> {
    merge_replaces(diff_lines(left, right))
}

/// Build comparison rows between the live text (`left`) and the old
/// revision (`right`).
///
/// Each row carries the item signature of its left line, falling back to
/// the right line.
pub fn build_diff_rows<S: AsRef<str>>(left: &[S], right: &[S]) -> Vec<DiffRow> {
    let left_refs = build_line_refs(left);
    let right_refs = build_line_refs(right);
    let left_signature = |line: usize| signature_at(&left_refs, line);
    let right_signature = |line: usize| signature_at(&right_refs, line);

    diff_and_merge(left, right)
        .into_iter()
        .map(|op| match op {
            EditOp::Equal {
                right_text,
                left_line,
                right_line,
                ..
            } => DiffRow {
                kind: RowKind::Same,
                title: String::new(),
                right_text,
                left_line: Some(left_line),
                right_line: Some(right_line),
                signature: left_signature(left_line).or_else(|| right_signature(right_line)),
            },
            EditOp::Insert {
                right_text,
                right_line,
            } => DiffRow {
                kind: RowKind::Added,
                title: "Only in old file".to_string(),
                right_text,
                left_line: None,
                right_line: Some(right_line),
                signature: right_signature(right_line),
            },
            EditOp::Delete {
                left_text,
                left_line,
            } => DiffRow {
                kind: RowKind::Removed,
                title: format!("Left only: {left_text}"),
                right_text: String::new(),
                left_line: Some(left_line),
                right_line: None,
                signature: left_signature(left_line),
            },
            EditOp::Replace {
                left_text,
                right_text,
                left_line,
                right_line,
            } => DiffRow {
                kind: RowKind::Changed,
                title: format!("Left: {left_text}"),
                right_text,
                left_line: Some(left_line),
                right_line: Some(right_line),
                signature: left_signature(left_line).or_else(|| right_signature(right_line)),
            },
        })
        .collect()
}

fn signature_at(refs: &[LineRef], line: usize) -> Option<ItemSignature> {
    line.checked_sub(1)
        .and_then(|idx| refs.get(idx))
        .and_then(|r| r.signature.clone())
}

fn line_token<S: AsRef<str>>(line: &S) -> u64 {
    xxh3_64(line.as_ref().as_bytes())
}

fn compute_ops(a: &[u64], b: &[u64]) -> Vec<Op> {
    let n = a.len();
    let m = b.len();

    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut i = 0usize;
    let mut j = 0usize;
    let mut ops = Vec::with_capacity(n + m);

    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if j < m && (i == n || lcs[i][j + 1] >= lcs[i + 1][j]) {
            ops.push(Op::Insert);
            j += 1;
        } else {
            ops.push(Op::Delete);
            i += 1;
        }
    }

    ops
}
