//! Formatting fingerprint of a YAML source text.
//!
//! Before a document is rendered back to text, the original source is scanned
//! for everything the canonical renderer would otherwise normalize away:
//! indentation width, tab usage, blank line placement, flow collection
//! spacing, block scalar bodies, inline comment columns and zero-indented
//! sequences. The reconciliation passes consume this record to restore the
//! original look wherever the content still matches.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, trace};

use super::node::{Node, NodeStyle, ScalarKind, ScalarStyle};
use super::path::{self, parse_path};
use super::scan::{self, LineKind, ScannedLine};

const DEFAULT_INDENT_UNIT: usize = 2;
const MAX_INDENT_UNIT: usize = 8;

/// Spacing convention inside a single-line flow collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSpacing {
    /// `[1, 2, 3]`
    Standard,
    /// `[ 1, 2, 3 ]`
    Spaced,
    /// `[1,2,3]`
    Compact,
}

/// Original text of a flow collection value.
#[derive(Debug, Clone)]
pub struct FlowSpan {
    /// Verbatim source from the opening bracket onward. Multiline values keep
    /// every continuation line with its leading whitespace, joined by `\n`.
    pub text: String,
    /// `[` or `{`
    pub delimiter: char,
    pub multiline: bool,
    pub spacing: FlowSpacing,
}

/// Original lines of a literal or folded block scalar.
#[derive(Debug, Clone)]
pub struct ScalarBlock {
    /// Full source lines of the construct, header line first, verbatim.
    pub lines: Vec<String>,
    /// `|` or `>`
    pub style: char,
    /// Resolved scalar value, used to decide whether the content changed.
    pub resolved: String,
}

/// Everything the canonical renderer cannot know about the original text.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    /// Spaces per indentation level
    pub indent_unit: usize,
    pub uses_tabs: bool,
    /// Blank lines sitting immediately above a node's first line, by path
    pub blanks_before: HashMap<String, usize>,
    /// Blank lines sitting immediately above a comment line, keyed by the
    /// trimmed comment text, one queue entry per occurrence in document order
    pub comment_blanks: HashMap<String, VecDeque<usize>>,
    /// Flow collection values by path
    pub flow_spans: HashMap<String, FlowSpan>,
    /// Literal and folded block scalars by path
    pub scalar_blocks: HashMap<String, ScalarBlock>,
    /// Spaces between a line's content and its trailing `#`, by path
    pub comment_gaps: HashMap<String, usize>,
    /// Literal leading whitespace of the line that introduces each path
    pub exact_ws: HashMap<String, String>,
    /// Sequences whose items sit at their parent key's indent
    pub zero_indent: HashSet<String>,
    pub doc_start: bool,
    pub doc_end: bool,
    /// Comment lines that appeared above the `---` marker
    pub pre_marker_comments: Vec<String>,
}

impl Fingerprint {
    /// Scan `text` and record its formatting.
    pub fn extract(text: &str) -> Fingerprint {
        let lines: Vec<&str> = text.split('\n').collect();
        let scanned = scan::scan(text);
        let mut fp = Fingerprint::default();

        fp.pre_marker_comments = pre_marker_comments(&scanned);

        // Indent evidence: every section key followed by a deeper line
        // contributes one parent-to-child delta.
        let mut deltas: Vec<usize> = Vec::new();
        let mut pending_parent: Option<usize> = None;
        // Key column of every mapping entry seen so far, for zero-indent
        // detection of the sequences below them.
        let mut entry_cols: HashMap<String, usize> = HashMap::new();
        let mut blank_run = 0usize;

        let mut i = 0;
        while i < scanned.len() {
            let l = &scanned[i];
            match l.kind {
                LineKind::Blank => {
                    blank_run += 1;
                    i += 1;
                }
                LineKind::Comment => {
                    fp.comment_blanks
                        .entry(l.value.clone())
                        .or_default()
                        .push_back(blank_run);
                    blank_run = 0;
                    i += 1;
                }
                LineKind::DocStart => {
                    fp.doc_start = true;
                    blank_run = 0;
                    i += 1;
                }
                LineKind::DocEnd => {
                    fp.doc_end = true;
                    blank_run = 0;
                    i += 1;
                }
                LineKind::FlowContinuation | LineKind::BlockBody => {
                    blank_run = 0;
                    i += 1;
                }
                LineKind::Entry | LineKind::Item => {
                    if l.ws.contains('\t') {
                        fp.uses_tabs = true;
                    }
                    if let Some(p) = l.line_path() {
                        if blank_run > 0 {
                            fp.blanks_before.insert(p.to_string(), blank_run);
                        }
                        fp.exact_ws.insert(p.to_string(), l.ws.clone());
                    }
                    blank_run = 0;

                    if let Some(parent_col) = pending_parent.take() {
                        if l.indent > parent_col {
                            deltas.push(l.indent - parent_col);
                        }
                    }

                    let col = scan::content_col(l, lines[l.index]);
                    if l.key.is_some() {
                        if let Some(p) = &l.path {
                            entry_cols.insert(p.clone(), col);
                        }
                        if l.value.is_empty() {
                            pending_parent = Some(col);
                        }
                    }
                    if l.kind == LineKind::Item {
                        if let Some(ip) = &l.item_path {
                            if let Some(seq) = path::seq_owner(ip) {
                                if entry_cols.get(seq) == Some(&l.indent) {
                                    fp.zero_indent.insert(seq.to_string());
                                }
                            }
                        }
                    }

                    if let Some(c) = &l.comment {
                        if let Some(p) = &l.path {
                            fp.comment_gaps.insert(p.clone(), c.gap);
                        }
                    }

                    if let Some((span, consumed)) = capture_flow(&scanned, &lines, i) {
                        if let Some(p) = &l.path {
                            trace!("flow span at '{}': {} lines", p, consumed);
                            fp.flow_spans.insert(p.clone(), span);
                        }
                        i += consumed;
                        continue;
                    }
                    if l.has_block_header() {
                        let (block, consumed) = capture_block(&scanned, &lines, i);
                        if let Some(p) = &l.path {
                            trace!("block scalar at '{}': {} lines", p, consumed);
                            fp.scalar_blocks.insert(p.clone(), block);
                        }
                        i += consumed;
                        continue;
                    }
                    i += 1;
                }
            }
        }

        fp.indent_unit = indent_unit_of(&deltas);
        debug!(
            "fingerprint: unit={} tabs={} flows={} blocks={} zero-indent={}",
            fp.indent_unit,
            fp.uses_tabs,
            fp.flow_spans.len(),
            fp.scalar_blocks.len(),
            fp.zero_indent.len()
        );
        fp
    }

    /// Push recorded styles onto the tree before rendering, so values that
    /// replaced a flow collection or a block scalar keep the original shape.
    pub fn apply_to_tree(&self, root: &mut Node) {
        for p in self.flow_spans.keys() {
            if let Some(node) = lookup_mut(root, p) {
                if !node.is_scalar() {
                    node.style = NodeStyle::Flow;
                }
            }
        }
        for (p, block) in &self.scalar_blocks {
            if let Some(node) = lookup_mut(root, p) {
                let keep = match node.as_scalar() {
                    Some(s) => s.kind == ScalarKind::Str && !s.repr.is_empty(),
                    None => false,
                };
                if keep {
                    node.scalar_style = if block.style == '>' {
                        ScalarStyle::Folded
                    } else {
                        ScalarStyle::Literal
                    };
                }
            }
        }
    }
}

fn lookup_mut<'a>(root: &'a mut Node, p: &str) -> Option<&'a mut Node> {
    let steps = parse_path(p).ok()?;
    path::resolve_mut(root, &steps, p).ok()
}

/// Comment lines sitting above the `---` marker, if the document has one.
fn pre_marker_comments(scanned: &[ScannedLine]) -> Vec<String> {
    let mut comments = Vec::new();
    for l in scanned {
        match l.kind {
            LineKind::Blank => {}
            LineKind::Comment => comments.push(l.value.clone()),
            LineKind::DocStart => return comments,
            _ => break,
        }
    }
    Vec::new()
}

fn indent_unit_of(deltas: &[usize]) -> usize {
    if deltas.is_empty() {
        return DEFAULT_INDENT_UNIT;
    }
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &d in deltas {
        *counts.entry(d).or_insert(0) += 1;
    }
    let (&mode, &count) = counts
        .iter()
        .max_by_key(|&(&d, &c)| (c, std::cmp::Reverse(d)))
        .unwrap_or((&DEFAULT_INDENT_UNIT, &0));
    // A clear majority wins; otherwise fall back to the common divisor so a
    // mixed document still lands on a width that divides everything.
    if count * 10 >= deltas.len() * 7 {
        return mode.clamp(1, MAX_INDENT_UNIT);
    }
    let mut g = 0;
    for &d in deltas {
        g = gcd(g, d);
    }
    g.clamp(1, MAX_INDENT_UNIT)
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Capture the flow collection starting on line `i`, when there is one.
/// Returns the span and the number of scanned lines it covers.
fn capture_flow(
    scanned: &[ScannedLine],
    lines: &[&str],
    i: usize,
) -> Option<(FlowSpan, usize)> {
    let l = &scanned[i];
    if !matches!(l.kind, LineKind::Entry | LineKind::Item) {
        return None;
    }
    let raw = lines[l.index];
    let content = &raw[l.ws.len()..];
    let (body, _) = scan::comment_split(content);
    let voff = scan::value_offset(body);
    let bracket = voff + scan::skip_node_props(&body[voff..]);
    let delimiter = match body[bracket..].chars().next() {
        Some(c @ ('[' | '{')) => c,
        _ => return None,
    };

    let mut consumed = 1;
    while i + consumed < scanned.len() && scanned[i + consumed].kind == LineKind::FlowContinuation
    {
        consumed += 1;
    }

    if consumed == 1 {
        let vtext = &body[bracket..];
        let (_, close) = scan::top_level_commas(vtext)?;
        let text = vtext[..=close].to_string();
        let spacing = detect_spacing(&text);
        return Some((
            FlowSpan {
                text,
                delimiter,
                multiline: false,
                spacing,
            },
            1,
        ));
    }

    // Multiline: keep the rest of the first line, trailing comment included,
    // then every continuation line verbatim.
    let mut text = content[bracket..].trim_end().to_string();
    for line in &scanned[i + 1..i + consumed] {
        text.push('\n');
        text.push_str(lines[line.index].trim_end());
    }
    Some((
        FlowSpan {
            text,
            delimiter,
            multiline: true,
            spacing: FlowSpacing::Standard,
        },
        consumed,
    ))
}

fn detect_spacing(text: &str) -> FlowSpacing {
    if text.len() < 2 {
        return FlowSpacing::Standard;
    }
    let inner = &text[1..text.len() - 1];
    if inner.trim().is_empty() {
        return FlowSpacing::Standard;
    }
    if inner.starts_with(' ') && inner.ends_with(' ') {
        return FlowSpacing::Spaced;
    }
    if let Some((commas, _)) = scan::top_level_commas(text) {
        if !commas.is_empty()
            && commas
                .iter()
                .all(|&c| text.as_bytes().get(c + 1) != Some(&b' '))
        {
            return FlowSpacing::Compact;
        }
    }
    FlowSpacing::Standard
}

/// Capture the block scalar whose header sits on line `i`.
fn capture_block(scanned: &[ScannedLine], lines: &[&str], i: usize) -> (ScalarBlock, usize) {
    let l = &scanned[i];
    let mut block_lines = vec![lines[l.index].to_string()];
    let mut consumed = 1;
    while i + consumed < scanned.len() && scanned[i + consumed].kind == LineKind::BlockBody {
        block_lines.push(lines[scanned[i + consumed].index].to_string());
        consumed += 1;
    }
    let (style, _, _) = parse_block_header(&l.value);
    let resolved = resolve_block(&l.value, &block_lines[1..], l.indent);
    (
        ScalarBlock {
            lines: block_lines,
            style,
            resolved,
        },
        consumed,
    )
}

/// Split a block scalar header into style, indentation indicator and
/// chomping indicator.
fn parse_block_header(header: &str) -> (char, Option<usize>, char) {
    let mut chars = header.chars();
    let style = chars.next().unwrap_or('|');
    let mut digit = None;
    let mut chomp = ' ';
    for c in chars {
        match c {
            '1'..='9' => digit = Some(c as usize - '0' as usize),
            '-' | '+' => chomp = c,
            _ => break,
        }
    }
    (style, digit, chomp)
}

/// Resolve a block scalar's body the way a parser would, so the result can
/// be compared against the value held in the tree.
pub fn resolve_block(header: &str, body: &[String], owner_indent: usize) -> String {
    let (style, digit, chomp) = parse_block_header(header);
    let dedent = match digit {
        Some(d) => owner_indent + d,
        None => body
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| scan::leading_ws(l).0.chars().count())
            .min()
            .unwrap_or(0),
    };
    let mut stripped: Vec<String> = body.iter().map(|l| strip_indent(l, dedent)).collect();
    let mut trailing = 0;
    while stripped.last().map(|l| l.is_empty()) == Some(true) {
        stripped.pop();
        trailing += 1;
    }
    let content = if style == '>' {
        fold_lines(&stripped)
    } else {
        stripped.join("\n")
    };
    match chomp {
        '-' => content,
        '+' => {
            let mut s = content;
            if !s.is_empty() || trailing > 0 {
                s.push('\n');
            }
            s.push_str(&"\n".repeat(trailing));
            s
        }
        _ => {
            let mut s = content;
            if !s.is_empty() {
                s.push('\n');
            }
            s
        }
    }
}

fn strip_indent(line: &str, n: usize) -> String {
    if line.trim().is_empty() {
        return String::new();
    }
    let bytes = line.as_bytes();
    let mut pos = 0;
    while pos < n && pos < bytes.len() && bytes[pos] == b' ' {
        pos += 1;
    }
    line[pos..].to_string()
}

/// Join folded scalar lines: breaks between plain lines become spaces, empty
/// lines become line breaks, and more-indented lines keep their breaks.
fn fold_lines(body: &[String]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for line in body {
        match prev {
            None => out.push_str(line),
            Some(p) => {
                if line.is_empty() {
                    out.push('\n');
                } else if p.is_empty() {
                    out.push_str(line);
                } else if p.starts_with(' ') || line.starts_with(' ') {
                    out.push('\n');
                    out.push_str(line);
                } else {
                    out.push(' ');
                    out.push_str(line);
                }
            }
        }
        prev = Some(line);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
