//! Mutable document tree.
//!
//! Every parsed YAML node keeps its container style (block or flow), its
//! scalar presentation style, and the comments attached to it, so a document
//! can be edited and written back without losing annotations.

use indexmap::IndexMap;

/// Container layout as it appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStyle {
    /// Indentation-based layout
    Block,
    /// Bracketed single-expression layout (`[..]` / `{..}`)
    Flow,
}

/// Scalar presentation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block scalar
    Literal,
    /// `>` block scalar
    Folded,
}

/// Resolved type of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

/// A scalar value with its source text.
///
/// `repr` holds the text exactly as it appeared between the quotes (or bare,
/// for plain scalars), so an untouched scalar round-trips verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub repr: String,
    pub kind: ScalarKind,
}

impl Scalar {
    /// Build a scalar from plain source text, resolving its type the way the
    /// YAML 1.1 core schema does.
    pub fn from_plain(repr: &str) -> Self {
        Scalar {
            kind: infer_kind(repr),
            repr: repr.to_string(),
        }
    }

    /// Build a string scalar (quoted in the source, so never re-resolved).
    pub fn from_string(repr: &str) -> Self {
        Scalar {
            repr: repr.to_string(),
            kind: ScalarKind::Str,
        }
    }

    pub fn null() -> Self {
        Scalar {
            repr: "null".to_string(),
            kind: ScalarKind::Null,
        }
    }

    pub fn bool(b: bool) -> Self {
        Scalar {
            repr: if b { "true" } else { "false" }.to_string(),
            kind: ScalarKind::Bool,
        }
    }

    pub fn int(i: i64) -> Self {
        Scalar {
            repr: i.to_string(),
            kind: ScalarKind::Int,
        }
    }

    pub fn float(x: f64) -> Self {
        Scalar {
            repr: float_repr(x),
            kind: ScalarKind::Float,
        }
    }
}

/// Canonical text for a float, always distinguishable from an int.
fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return ".nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let s = x.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Resolve the type a plain scalar would take under the core schema.
pub fn infer_kind(repr: &str) -> ScalarKind {
    match repr {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarKind::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" | "yes" | "Yes" | "YES" | "no"
        | "No" | "NO" | "on" | "On" | "ON" | "off" | "Off" | "OFF" => return ScalarKind::Bool,
        ".inf" | "+.inf" | "-.inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN" => {
            return ScalarKind::Float
        }
        _ => {}
    }
    if parse_int(repr).is_some() {
        ScalarKind::Int
    } else if looks_like_float(repr) {
        ScalarKind::Float
    } else {
        ScalarKind::Str
    }
}

/// Parse an integer repr, including the `0x` / `0o` forms YAML accepts.
pub fn parse_int(repr: &str) -> Option<i64> {
    let (sign, body) = match repr.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, repr.strip_prefix('+').unwrap_or(repr)),
    };
    if body.is_empty() {
        return None;
    }
    let parsed = if let Some(hex) = body.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = body.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else {
        body.parse::<i64>().ok()
    };
    parsed.map(|v| sign * v)
}

fn looks_like_float(repr: &str) -> bool {
    // Require a digit somewhere so "." and "-" do not resolve to floats.
    repr.parse::<f64>().is_ok() && repr.chars().any(|c| c.is_ascii_digit())
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(IndexMap<String, Node>),
}

/// One node of the document tree.
///
/// Comments ride on the node they annotate: `head_comment` holds the full
/// comment lines found above it, `line_comment` the trailing comment on its
/// own line, and `foot_comment` any comment lines left after the final entry
/// of the document. Comment text includes the leading `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub style: NodeStyle,
    pub scalar_style: ScalarStyle,
    /// Presentation of the mapping key this node hangs under, when quoted
    pub key_style: Option<ScalarStyle>,
    pub head_comment: Option<String>,
    pub line_comment: Option<String>,
    pub foot_comment: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            style: NodeStyle::Block,
            scalar_style: ScalarStyle::Plain,
            key_style: None,
            head_comment: None,
            line_comment: None,
            foot_comment: None,
        }
    }

    pub fn scalar(s: Scalar) -> Self {
        Node::new(NodeKind::Scalar(s))
    }

    pub fn null() -> Self {
        Node::scalar(Scalar::null())
    }

    pub fn mapping() -> Self {
        Node::new(NodeKind::Mapping(IndexMap::new()))
    }

    pub fn sequence() -> Self {
        Node::new(NodeKind::Sequence(Vec::new()))
    }

    pub fn with_style(mut self, style: NodeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    /// True for a null scalar, the only node kind `resolve_or_create` is
    /// allowed to overwrite with a fresh container.
    pub fn is_null(&self) -> bool {
        matches!(&self.kind, NodeKind::Scalar(s) if s.kind == ScalarKind::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match &self.kind {
            NodeKind::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match &mut self.kind {
            NodeKind::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Human-readable node type for error messages.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Scalar(s) => match s.kind {
                ScalarKind::Null => "null",
                ScalarKind::Bool => "bool",
                ScalarKind::Int => "int",
                ScalarKind::Float => "float",
                ScalarKind::Str => "string",
            },
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }

    /// Move the comments of a node being replaced onto its replacement, so an
    /// edit does not silently drop annotations. Comments already present on
    /// the replacement win.
    pub fn inherit_comments(&mut self, old: &Node) {
        if self.head_comment.is_none() {
            self.head_comment = old.head_comment.clone();
        }
        if self.line_comment.is_none() {
            self.line_comment = old.line_comment.clone();
        }
        if self.foot_comment.is_none() {
            self.foot_comment = old.foot_comment.clone();
        }
    }

    /// Carry a replaced node's presentation onto its replacement: comments,
    /// the key's quoting, and container layout when both sides are
    /// containers.
    pub fn inherit_presentation(&mut self, old: &Node) {
        self.inherit_comments(old);
        self.key_style = old.key_style;
        if !self.is_scalar() && !old.is_scalar() {
            self.style = old.style;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
