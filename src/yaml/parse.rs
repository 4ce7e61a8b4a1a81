//! Event-driven parsing into annotated trees.
//!
//! yaml-rust2 hands us a marked event stream; we build [`Node`] trees from
//! it, detect flow vs block layout by peeking at the source around each
//! event marker, and then walk the raw lines once more to attach comments
//! to the nodes they annotate.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::error::Error;
use super::node::{infer_kind, Node, NodeKind, Scalar, ScalarKind, NodeStyle, ScalarStyle};
use super::scan::{self, LineKind};

/// A parsed document: the tree plus the explicit markers seen in the text.
#[derive(Debug)]
pub struct Parsed {
    pub root: Node,
    pub doc_start: bool,
    pub doc_end: bool,
}

/// Parse one YAML document into an annotated tree.
///
/// # Errors
///
/// Returns [`Error::Parse`] for syntax errors, unresolved aliases, and
/// non-scalar mapping keys.
pub fn parse_document(text: &str) -> Result<Parsed, Error> {
    let src = SourceMap::new(text);
    let mut parser = Parser::new_from_str(text);
    let mut builder = TreeBuilder::new(&src);
    parser.load(&mut builder, false)?;

    if let Some(err) = builder.error {
        return Err(err);
    }

    let (mut root, shadow) = match builder.root {
        Some(pair) => pair,
        None => (Node::mapping(), Shadow::Leaf(usize::MAX)),
    };

    let scanned = scan::scan(text);
    let doc_start = scanned.iter().any(|l| l.kind == LineKind::DocStart);
    let doc_end = scanned.iter().any(|l| l.kind == LineKind::DocEnd);

    attach_comments(&mut root, &shadow, &scanned);

    debug!(
        "parsed document: {} ({} lines)",
        root.type_name(),
        scanned.len()
    );
    Ok(Parsed {
        root,
        doc_start,
        doc_end,
    })
}

// =============================================================================
// Source map
// =============================================================================

/// Character-indexed view of the source, since event markers count chars.
struct SourceMap {
    chars: Vec<char>,
    line_starts: Vec<usize>,
}

impl SourceMap {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut line_starts = vec![0];
        for (i, c) in chars.iter().enumerate() {
            if *c == '\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { chars, line_starts }
    }

    /// Zero-based line number of a character offset.
    fn line_of(&self, idx: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= idx) - 1
    }

    /// Decide whether the construct starting at a marker uses flow layout.
    ///
    /// The marker normally sits on the opening bracket; when it sits on the
    /// first inner token instead (or after an anchor or tag), the scans in
    /// both directions still find the bracket.
    fn flow_at(&self, marker: &Marker) -> NodeStyle {
        let mut i = marker.index();
        // Forward: skip whitespace plus any anchor/tag tokens
        while i < self.chars.len() {
            match self.chars[i] {
                ' ' | '\t' | '\n' | '\r' => i += 1,
                '&' | '!' => {
                    while i < self.chars.len() && !self.chars[i].is_whitespace() {
                        i += 1;
                    }
                }
                '[' | '{' => return NodeStyle::Flow,
                _ => break,
            }
        }
        // Backward: the marker may point just past the bracket
        let mut j = marker.index();
        while j > 0 {
            j -= 1;
            match self.chars[j] {
                ' ' | '\t' | '\n' | '\r' => continue,
                '[' | '{' => return NodeStyle::Flow,
                _ => break,
            }
        }
        NodeStyle::Block
    }
}

// =============================================================================
// Event-stream tree builder
// =============================================================================

/// Line skeleton mirroring the tree, kept only during parsing so comments
/// can be matched to source lines after the tree exists.
enum Shadow {
    Leaf(usize),
    Seq(Vec<(usize, Shadow)>),
    Map(Vec<(String, usize, Shadow)>),
}

enum BuildNode {
    Sequence {
        style: NodeStyle,
        line: usize,
        anchor: usize,
        items: Vec<(usize, Node, Shadow)>,
    },
    Mapping {
        style: NodeStyle,
        line: usize,
        anchor: usize,
        entries: Vec<(String, usize, Node, Shadow)>,
        pending_key: Option<(String, usize, ScalarStyle)>,
    },
}

struct TreeBuilder<'a> {
    src: &'a SourceMap,
    stack: Vec<BuildNode>,
    root: Option<(Node, Shadow)>,
    anchors: HashMap<usize, Node>,
    error: Option<Error>,
}

impl<'a> TreeBuilder<'a> {
    fn new(src: &'a SourceMap) -> Self {
        TreeBuilder {
            src,
            stack: Vec::new(),
            root: None,
            anchors: HashMap::new(),
            error: None,
        }
    }

    fn fail(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(Error::Parse(msg));
        }
    }

    fn push_complete(&mut self, mut node: Node, shadow: Shadow, line: usize) {
        let mut deferred_error = None;
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some((node, shadow));
                }
            }
            Some(BuildNode::Sequence { items, .. }) => {
                items.push((line, node, shadow));
            }
            Some(BuildNode::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some((key, key_line, key_style)) => {
                    if key_style != ScalarStyle::Plain {
                        node.key_style = Some(key_style);
                    }
                    entries.push((key, key_line, node, shadow));
                }
                None => {
                    let key_style = node.scalar_style;
                    match node.kind {
                        NodeKind::Scalar(s) => {
                            *pending_key = Some((s.repr, line, key_style));
                        }
                        _ => {
                            deferred_error = Some(format!(
                                "non-scalar mapping keys are not supported (line {}).",
                                line + 1
                            ));
                            *pending_key = Some((String::new(), line, ScalarStyle::Plain));
                        }
                    }
                }
            },
        }
        if let Some(msg) = deferred_error {
            self.fail(msg);
        }
    }
}

impl<'a> MarkedEventReceiver for TreeBuilder<'a> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        let line = self.src.line_of(marker.index());
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor, _) => {
                let scalar_style = match style {
                    TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
                    TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
                    TScalarStyle::Literal => ScalarStyle::Literal,
                    TScalarStyle::Folded => ScalarStyle::Folded,
                    _ => ScalarStyle::Plain,
                };
                let kind = if scalar_style == ScalarStyle::Plain {
                    infer_kind(&value)
                } else {
                    ScalarKind::Str
                };
                let mut node = Node::scalar(Scalar { repr: value, kind });
                node.scalar_style = scalar_style;
                if anchor > 0 {
                    self.anchors.insert(anchor, node.clone());
                }
                self.push_complete(node, Shadow::Leaf(line), line);
            }

            Event::SequenceStart(anchor, _) => {
                self.stack.push(BuildNode::Sequence {
                    style: self.src.flow_at(&marker),
                    line,
                    anchor,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => {
                if let Some(BuildNode::Sequence {
                    style,
                    line,
                    anchor,
                    items,
                }) = self.stack.pop()
                {
                    let mut children = Vec::with_capacity(items.len());
                    let mut shadows = Vec::with_capacity(items.len());
                    for (item_line, node, shadow) in items {
                        children.push(node);
                        shadows.push((item_line, shadow));
                    }
                    let mut node = Node::new(NodeKind::Sequence(children));
                    node.style = style;
                    if anchor > 0 {
                        self.anchors.insert(anchor, node.clone());
                    }
                    self.push_complete(node, Shadow::Seq(shadows), line);
                }
            }

            Event::MappingStart(anchor, _) => {
                self.stack.push(BuildNode::Mapping {
                    style: self.src.flow_at(&marker),
                    line,
                    anchor,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }

            Event::MappingEnd => {
                if let Some(BuildNode::Mapping {
                    style,
                    line,
                    anchor,
                    entries,
                    ..
                }) = self.stack.pop()
                {
                    let mut map = indexmap::IndexMap::with_capacity(entries.len());
                    let mut shadows = Vec::with_capacity(entries.len());
                    for (key, key_line, node, shadow) in entries {
                        if map.contains_key(&key) {
                            warn!(
                                "duplicate key '{}' (line {}), last value wins",
                                key,
                                key_line + 1
                            );
                        }
                        map.insert(key.clone(), node);
                        shadows.push((key, key_line, shadow));
                    }
                    let mut node = Node::new(NodeKind::Mapping(map));
                    node.style = style;
                    if anchor > 0 {
                        self.anchors.insert(anchor, node.clone());
                    }
                    self.push_complete(node, Shadow::Map(shadows), line);
                }
            }

            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(node) => {
                    let node = node.clone();
                    self.push_complete(node, Shadow::Leaf(line), line);
                }
                None => self.fail(format!("unresolved alias on line {}.", line + 1)),
            },
        }
    }
}

// =============================================================================
// Comment attachment
// =============================================================================

struct Claims {
    heads: HashMap<usize, Vec<String>>,
    trailers: HashMap<usize, String>,
}

fn attach_comments(root: &mut Node, shadow: &Shadow, scanned: &[scan::ScannedLine]) {
    let mut anchor_lines = HashSet::new();
    collect_anchor_lines(shadow, &mut anchor_lines);

    // Sweep the lines once, handing each run of full-line comments to the
    // next anchored line below it.
    let mut claims = Claims {
        heads: HashMap::new(),
        trailers: HashMap::new(),
    };
    let mut pending: Vec<String> = Vec::new();
    for line in scanned {
        match line.kind {
            LineKind::Comment => pending.push(line.value.clone()),
            LineKind::Blank | LineKind::DocStart | LineKind::DocEnd => {}
            LineKind::Entry | LineKind::Item => {
                if anchor_lines.contains(&line.index) {
                    if !pending.is_empty() {
                        claims.heads.insert(line.index, std::mem::take(&mut pending));
                    }
                } else {
                    pending.clear();
                }
                if let Some(c) = &line.comment {
                    claims.trailers.insert(line.index, c.text.clone());
                }
            }
            LineKind::FlowContinuation | LineKind::BlockBody => pending.clear(),
        }
    }

    attach(root, usize::MAX, shadow, &mut claims);

    // Whatever is left trails the document; it becomes the foot of the last
    // top-level node, or the head of an otherwise empty document.
    if !pending.is_empty() {
        let text = pending.join("\n");
        match last_top_node(root) {
            Some(node) => append_comment(&mut node.foot_comment, &text),
            None => append_comment(&mut root.head_comment, &text),
        }
    }
}

fn collect_anchor_lines(shadow: &Shadow, out: &mut HashSet<usize>) {
    match shadow {
        Shadow::Leaf(line) => {
            if *line != usize::MAX {
                out.insert(*line);
            }
        }
        Shadow::Seq(items) => {
            for (line, child) in items {
                out.insert(*line);
                collect_anchor_lines(child, out);
            }
        }
        Shadow::Map(entries) => {
            for (_, line, child) in entries {
                out.insert(*line);
                collect_anchor_lines(child, out);
            }
        }
    }
}

/// Recursive walk matching the tree against its line skeleton. Heads are
/// claimed on the way down so the outermost node on a line gets them; the
/// trailing comment is claimed on the way back up, landing on the innermost.
fn attach(node: &mut Node, line: usize, shadow: &Shadow, claims: &mut Claims) {
    if let Some(head) = claims.heads.remove(&line) {
        append_comment(&mut node.head_comment, &head.join("\n"));
    }

    match shadow {
        Shadow::Leaf(_) => {}
        Shadow::Seq(items) => {
            if let NodeKind::Sequence(children) = &mut node.kind {
                for ((item_line, child_shadow), child) in items.iter().zip(children.iter_mut()) {
                    attach(child, *item_line, child_shadow, claims);
                }
            }
        }
        Shadow::Map(entries) => {
            if let NodeKind::Mapping(map) = &mut node.kind {
                for (key, key_line, child_shadow) in entries {
                    if let Some(child) = map.get_mut(key) {
                        attach(child, *key_line, child_shadow, claims);
                    }
                }
            }
        }
    }

    if node.line_comment.is_none() {
        if let Some(trailer) = claims.trailers.remove(&line) {
            node.line_comment = Some(trailer);
        }
    }
}

fn last_top_node(root: &mut Node) -> Option<&mut Node> {
    if matches!(root.kind, NodeKind::Scalar(_)) {
        return Some(root);
    }
    match &mut root.kind {
        NodeKind::Mapping(map) => map.last_mut().map(|(_, v)| v),
        NodeKind::Sequence(items) => items.last_mut(),
        NodeKind::Scalar(_) => unreachable!(),
    }
}

fn append_comment(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
