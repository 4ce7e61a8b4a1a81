//! Reconciliation of canonical output with the original formatting.
//!
//! The renderer produces a fixed 2-space canonical text. This module reworks
//! that text through an ordered chain of passes until it matches the
//! formatting recorded in the [`Fingerprint`]: indentation, flow spacing,
//! blank lines, block scalar bodies, comment placement and document markers.
//! Each pass is best effort and never fails; a construct that cannot be
//! located confidently keeps its canonical form.

use std::collections::{HashMap, VecDeque};

use log::debug;

use super::comment::{self, CommentMode};
use super::fingerprint::{resolve_block, Fingerprint};
use super::flow;
use super::path::seq_owner;
use super::scan::{self, LineKind};

/// Apply every reconciliation pass in order. `original` is only consulted
/// for whitespace-only lines it intentionally contained.
pub fn reconcile(
    rendered: &str,
    original: &str,
    fp: &Fingerprint,
    mode: CommentMode,
    keep_markers: bool,
) -> String {
    let mut text = remap_indent(rendered, fp);
    text = flow::respace_arrays(&text, fp);
    text = flow::reapply_spans(&text, fp);
    text = apply_exact_indent(&text, fp);
    text = reinsert_blanks(&text, fp);
    text = splice_scalar_blocks(&text, fp);
    text = dedent_zero_indent(&text, fp);
    text = comment::align_comments(&text, fp, mode);
    if keep_markers {
        text = restore_markers(&text, fp);
    }
    text = cleanup_blank_lines(&text, original);
    debug!(
        "reconciled {} rendered lines into {}",
        rendered.split('\n').count(),
        text.split('\n').count()
    );
    text
}

// =============================================================================
// Pass 1: indentation remap
// =============================================================================

/// Rescale the canonical 2-space indentation to the document's unit, or to
/// tabs. Block scalar bodies keep their extra content indentation on top of
/// the rescaled structural part.
fn remap_indent(text: &str, fp: &Fingerprint) -> String {
    if !fp.uses_tabs && fp.indent_unit == 2 {
        return text.to_string();
    }
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut body_base: Option<usize> = None;

    for l in &scanned {
        let raw = lines[l.index];
        match l.kind {
            LineKind::Entry | LineKind::Item | LineKind::Comment => {
                if l.kind != LineKind::Comment {
                    body_base = if l.has_block_header() {
                        let owner = if l.kind == LineKind::Item && l.key.is_none() {
                            l.indent
                        } else {
                            scan::content_col(l, raw)
                        };
                        Some(owner + 2)
                    } else {
                        None
                    };
                }
                let wsn = l.ws.len();
                if l.ws.bytes().all(|b| b == b' ') && wsn % 2 == 0 {
                    out.push(format!("{}{}", unit_ws(fp, wsn / 2), &raw[wsn..]));
                } else {
                    out.push(raw.to_string());
                }
            }
            LineKind::BlockBody => {
                let base = body_base.unwrap_or(0);
                let wsn = l.ws.len();
                if l.ws.bytes().all(|b| b == b' ') && wsn >= base && base % 2 == 0 {
                    out.push(format!(
                        "{}{}{}",
                        unit_ws(fp, base / 2),
                        " ".repeat(wsn - base),
                        &raw[wsn..]
                    ));
                } else {
                    out.push(raw.to_string());
                }
            }
            _ => out.push(raw.to_string()),
        }
    }
    out.join("\n")
}

fn unit_ws(fp: &Fingerprint, depth: usize) -> String {
    if fp.uses_tabs {
        "\t".repeat(depth)
    } else {
        " ".repeat(depth * fp.indent_unit)
    }
}

// =============================================================================
// Pass 4: exact indentation
// =============================================================================

/// Force each content line back to the exact leading whitespace its path had
/// in the original text. Lines for paths the original never had keep the
/// rescaled grid from pass 1. Items of zero-indented sequences are left
/// alone so the zero-indent pass can move whole item blocks uniformly.
fn apply_exact_indent(text: &str, fp: &Fingerprint) -> String {
    if fp.exact_ws.is_empty() {
        return text.to_string();
    }
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for l in &scanned {
        let raw = lines[l.index];
        if !matches!(l.kind, LineKind::Entry | LineKind::Item) {
            out.push(raw.to_string());
            continue;
        }
        let path = l.line_path().filter(|p| !under_zero_indent(p, fp));
        match path.and_then(|p| fp.exact_ws.get(p)) {
            Some(ws) if ws != &l.ws => out.push(format!("{}{}", ws, &raw[l.ws.len()..])),
            _ => out.push(raw.to_string()),
        }
    }
    out.join("\n")
}

/// True when the path sits inside an item of a zero-indented sequence.
fn under_zero_indent(path: &str, fp: &Fingerprint) -> bool {
    fp.zero_indent
        .iter()
        .any(|owner| path.len() > owner.len() && path.starts_with(owner.as_str())
            && path[owner.len()..].starts_with('['))
}

// =============================================================================
// Pass 5: blank line reinsertion
// =============================================================================

/// Put back the blank runs recorded above nodes and comments. Blanks already
/// present are counted first so the pass never doubles them.
fn reinsert_blanks(text: &str, fp: &Fingerprint) -> String {
    if fp.blanks_before.is_empty() && fp.comment_blanks.is_empty() {
        return text.to_string();
    }
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut queues: HashMap<&str, VecDeque<usize>> = fp
        .comment_blanks
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut existing = 0usize;

    for l in &scanned {
        let raw = lines[l.index];
        if l.kind == LineKind::Blank {
            existing += 1;
            out.push(raw.to_string());
            continue;
        }
        let wanted = match l.kind {
            LineKind::Comment => queues
                .get_mut(l.value.as_str())
                .and_then(|q| q.pop_front())
                .unwrap_or(0),
            LineKind::Entry | LineKind::Item => l
                .line_path()
                .and_then(|p| fp.blanks_before.get(p))
                .copied()
                .unwrap_or(0),
            _ => 0,
        };
        for _ in existing..wanted {
            out.push(String::new());
        }
        existing = 0;
        out.push(raw.to_string());
    }
    out.join("\n")
}

// =============================================================================
// Pass 6: block scalar splice
// =============================================================================

/// Replace rendered literal and folded blocks with the original captured
/// lines whenever the resolved content still matches the original.
fn splice_scalar_blocks(text: &str, fp: &Fingerprint) -> String {
    if fp.scalar_blocks.is_empty() {
        return text.to_string();
    }
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < scanned.len() {
        let l = &scanned[i];
        if !matches!(l.kind, LineKind::Entry | LineKind::Item) || !l.has_block_header() {
            out.push(lines[l.index].to_string());
            i += 1;
            continue;
        }
        let mut body = Vec::new();
        let mut j = i + 1;
        while j < scanned.len() && scanned[j].kind == LineKind::BlockBody {
            body.push(lines[scanned[j].index].to_string());
            j += 1;
        }
        let original = l
            .path
            .as_deref()
            .and_then(|p| fp.scalar_blocks.get(p))
            .filter(|b| resolve_block(&l.value, &body, l.indent) == b.resolved);
        match original {
            Some(block) => out.extend(block.lines.iter().cloned()),
            None => {
                out.push(lines[l.index].to_string());
                out.extend(body);
            }
        }
        i = j;
    }
    out.join("\n")
}

// =============================================================================
// Pass 7: zero-indent sequences
// =============================================================================

/// Pull sequence items back to their parent key's column for sequences the
/// original kept unindented, moving each item's whole block and its head
/// comments along with it.
fn dedent_zero_indent(text: &str, fp: &Fingerprint) -> String {
    if fp.zero_indent.is_empty() {
        return text.to_string();
    }
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();

    let mut targets: HashMap<&str, &str> = HashMap::new();
    for l in &scanned {
        if l.kind == LineKind::Entry && l.item_path.is_none() {
            if let Some(p) = &l.path {
                targets.insert(p.as_str(), l.ws.as_str());
            }
        }
    }

    // line index -> spaces to strip
    let mut fixes: HashMap<usize, usize> = HashMap::new();
    for (i, l) in scanned.iter().enumerate() {
        if l.kind != LineKind::Item {
            continue;
        }
        let Some(ip) = &l.item_path else { continue };
        let Some(owner) = seq_owner(ip) else { continue };
        if !fp.zero_indent.contains(owner) {
            continue;
        }
        let Some(target) = targets.get(owner) else {
            continue;
        };
        if !l.ws.bytes().all(|b| b == b' ')
            || !target.bytes().all(|b| b == b' ')
            || l.ws.len() <= target.len()
        {
            continue;
        }
        let delta = l.ws.len() - target.len();
        fixes.entry(i).or_insert(delta);
        let mut j = i;
        while j > 0 && scanned[j - 1].kind == LineKind::Comment && scanned[j - 1].ws == l.ws {
            j -= 1;
            fixes.entry(j).or_insert(delta);
        }
        let mut k = i + 1;
        while k < scanned.len() {
            match scanned[k].kind {
                LineKind::Blank => k += 1,
                LineKind::DocStart | LineKind::DocEnd => break,
                _ if scanned[k].indent > l.indent => {
                    fixes.entry(k).or_insert(delta);
                    k += 1;
                }
                _ => break,
            }
        }
    }
    if fixes.is_empty() {
        return text.to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, raw) in lines.iter().enumerate() {
        match fixes.get(&i) {
            Some(&delta) if raw.len() >= delta && raw[..delta].bytes().all(|b| b == b' ') => {
                out.push(raw[delta..].to_string())
            }
            _ => out.push(raw.to_string()),
        }
    }
    out.join("\n")
}

// =============================================================================
// Pass 9: document markers
// =============================================================================

/// Re-emit `---` and `...` when the original had them. Comments that stood
/// above the original start marker stay above it.
fn restore_markers(text: &str, fp: &Fingerprint) -> String {
    if !fp.doc_start && !fp.doc_end {
        return text.to_string();
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if fp.doc_start && !lines.iter().any(|l| l.trim_end() == "---") {
        let mut at = 0;
        let mut matched = 0;
        for (idx, line) in lines.iter().enumerate() {
            if matched == fp.pre_marker_comments.len() {
                break;
            }
            if line.trim_end() == fp.pre_marker_comments[matched] {
                matched += 1;
                at = idx + 1;
            } else if line.trim().is_empty() {
                continue;
            } else {
                break;
            }
        }
        if matched < fp.pre_marker_comments.len() {
            at = 0;
        }
        lines.insert(at, "---".to_string());
    }
    if fp.doc_end && !lines.iter().any(|l| l.trim_end() == "...") {
        lines.push("...".to_string());
    }
    lines.join("\n")
}

// =============================================================================
// Pass 10: whitespace-only lines
// =============================================================================

/// Reduce whitespace-only lines to empty ones, unless the original text had
/// that exact line at the same position.
fn cleanup_blank_lines(text: &str, original: &str) -> String {
    let orig: Vec<&str> = original.split('\n').collect();
    let out: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if !line.is_empty() && line.trim().is_empty() && orig.get(i) != Some(&line) {
                String::new()
            } else {
                line.to_string()
            }
        })
        .collect();
    out.join("\n")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn run(rendered: &str, original: &str) -> String {
        let fp = Fingerprint::extract(original);
        reconcile(rendered, original, &fp, CommentMode::Relative, true)
    }

    #[test]
    fn test_reconcile_remaps_indent_unit() {
        let original = indoc! {"
            server:
                host: localhost
                tls:
                    enabled: true
        "};
        let rendered = indoc! {"
            server:
              host: localhost
              tls:
                enabled: true
        "};
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_remaps_to_tabs() {
        let original = "a:\n\tb: 1\n";
        let rendered = "a:\n  b: 1\n";
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_remap_keeps_block_body_extra_indent() {
        let original = indoc! {"
            run:
                script: |
                    plain
                      deeper
        "};
        let rendered = indoc! {"
            run:
              script: |
                plain
                  deeper
        "};
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_exact_indent_off_grid() {
        let original = "a:\n   b: 1\n";
        let rendered = "a:\n  b: 1\n";
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_blank_lines() {
        let original = indoc! {"
            a: 1

            b: 2


            # note
            c: 3
        "};
        let rendered = indoc! {"
            a: 1
            b: 2
            # note
            c: 3
        "};
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_keeps_existing_blanks_single() {
        let original = "a: 1\n\nb: 2\n";
        let fp = Fingerprint::extract(original);
        let out = reconcile(original, original, &fp, CommentMode::Relative, true);
        assert_eq!(out, original);
    }

    #[test]
    fn test_reconcile_splices_block_scalar() {
        let original = indoc! {"
            script: |
                echo one

                echo two
            after: 1
        "};
        let rendered = indoc! {"
            script: |
              echo one

              echo two
            after: 1
        "};
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_changed_block_keeps_rendered() {
        let original = "script: |\n    old line\nafter: 1\n";
        let rendered = "script: |\n  new line\nafter: 1\n";
        assert_eq!(run(rendered, original), rendered);
    }

    #[test]
    fn test_reconcile_zero_indent_append() {
        let original = indoc! {"
            hosts:
            - alpha
        "};
        let rendered = indoc! {"
            hosts:
              - alpha
              - beta
        "};
        let expected = indoc! {"
            hosts:
            - alpha
            - beta
        "};
        assert_eq!(run(rendered, original), expected);
    }

    #[test]
    fn test_reconcile_zero_indent_moves_item_block() {
        let original = indoc! {"
            hosts:
            - name: a
              port: 1
        "};
        let rendered = indoc! {"
            hosts:
              - name: a
                port: 1
              - name: b
                port: 2
        "};
        let expected = indoc! {"
            hosts:
            - name: a
              port: 1
            - name: b
              port: 2
        "};
        assert_eq!(run(rendered, original), expected);
    }

    #[test]
    fn test_reconcile_restores_markers() {
        let original = indoc! {"
            # license
            ---
            a: 1
            ...
        "};
        let rendered = "# license\na: 1\n";
        assert_eq!(run(rendered, original), original);
    }

    #[test]
    fn test_reconcile_markers_can_be_disabled() {
        let original = "---\na: 1\n";
        let fp = Fingerprint::extract(original);
        let out = reconcile("a: 1\n", original, &fp, CommentMode::Relative, false);
        assert_eq!(out, "a: 1\n");
    }

    #[test]
    fn test_reconcile_flow_spacing_applies() {
        let original = "tags: [ a, b ]\nr: { cpu: 1, memory: 2 }\n";
        let rendered = "tags: [a, b, c]\nr: {cpu: 9, memory: 2}\n";
        let out = run(rendered, original);
        assert_eq!(out, "tags: [ a, b, c ]\nr: { cpu: 9, memory: 2 }\n");
    }

    #[test]
    fn test_cleanup_whitespace_only_lines() {
        let out = cleanup_blank_lines("a: 1\n   \nb: 2", "a: 1\n\nb: 2");
        assert_eq!(out, "a: 1\n\nb: 2");
        let kept = cleanup_blank_lines("a: 1\n   \nb: 2", "a: 1\n   \nb: 2");
        assert_eq!(kept, "a: 1\n   \nb: 2");
    }

    #[test]
    fn test_reconcile_comment_gap() {
        let original = "name: demo      # aligned\n";
        let rendered = "name: demo # aligned\n";
        assert_eq!(run(rendered, original), original);
    }
}
