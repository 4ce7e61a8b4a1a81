//! Canonical rendering of document trees.
//!
//! The renderer always emits the same convention: two-space indent, block
//! sequences indented one level under their key, compact `- key: value`
//! items, one space before inline comments. Everything the source did
//! differently is reapplied afterwards by the reconciliation passes, so this
//! stays simple and total: rendering cannot fail.

use super::node::{Node, NodeKind, Scalar, ScalarKind, NodeStyle, ScalarStyle};
use super::value::Value;

const UNIT: usize = 2;

fn ws(indent: usize) -> String {
    " ".repeat(indent * UNIT)
}

/// Render a tree as document text. Lines are newline-joined with no
/// trailing newline; the caller owns end-of-file normalization.
pub fn render(root: &Node) -> String {
    let mut out: Vec<String> = Vec::new();
    emit_root(&mut out, root);
    out.join("\n")
}

fn emit_root(out: &mut Vec<String>, root: &Node) {
    push_comment_lines(out, 0, root.head_comment.as_deref());
    match &root.kind {
        NodeKind::Mapping(map) if root.style == NodeStyle::Block && !map.is_empty() => {
            emit_entries(out, root, 0);
        }
        NodeKind::Sequence(items) if root.style == NodeStyle::Block && !items.is_empty() => {
            emit_items(out, root, 0);
        }
        NodeKind::Scalar(s) if is_block_scalar(root) => {
            emit_block_scalar(out, "", s, 0, root.line_comment.as_deref());
        }
        _ => {
            let line = flow_text(root);
            if !line.is_empty() || root.line_comment.is_some() {
                push_with_comment(out, line, root.line_comment.as_deref());
            }
        }
    }
    push_comment_lines(out, 0, root.foot_comment.as_deref());
}

fn emit_entries(out: &mut Vec<String>, node: &Node, indent: usize) {
    let map = match &node.kind {
        NodeKind::Mapping(map) => map,
        _ => return,
    };
    for (key, value) in map {
        push_comment_lines(out, indent, value.head_comment.as_deref());
        let lead = format!("{}{}:", ws(indent), render_key(key, value.key_style));
        emit_value_after(out, lead, value, indent);
        push_comment_lines(out, indent, value.foot_comment.as_deref());
    }
}

/// Emit a value whose owner text (`key:` or a dash) is already built.
fn emit_value_after(out: &mut Vec<String>, lead: String, value: &Node, indent: usize) {
    match &value.kind {
        NodeKind::Scalar(s) if is_block_scalar(value) => {
            emit_block_scalar(
                out,
                &format!("{} ", lead),
                s,
                indent,
                value.line_comment.as_deref(),
            );
        }
        NodeKind::Scalar(s) => {
            let text = scalar_text(s, value.scalar_style, false);
            let line = if text.is_empty() {
                lead
            } else {
                format!("{} {}", lead, text)
            };
            push_with_comment(out, line, value.line_comment.as_deref());
        }
        NodeKind::Mapping(map) => {
            if value.style == NodeStyle::Flow || map.is_empty() {
                let line = format!("{} {}", lead, flow_text(value));
                push_with_comment(out, line, value.line_comment.as_deref());
            } else {
                push_with_comment(out, lead, value.line_comment.as_deref());
                emit_entries(out, value, indent + 1);
            }
        }
        NodeKind::Sequence(items) => {
            if value.style == NodeStyle::Flow || items.is_empty() {
                let line = format!("{} {}", lead, flow_text(value));
                push_with_comment(out, line, value.line_comment.as_deref());
            } else {
                push_with_comment(out, lead, value.line_comment.as_deref());
                emit_items(out, value, indent + 1);
            }
        }
    }
}

fn emit_items(out: &mut Vec<String>, node: &Node, indent: usize) {
    let items = match &node.kind {
        NodeKind::Sequence(items) => items,
        _ => return,
    };
    for item in items {
        push_comment_lines(out, indent, item.head_comment.as_deref());
        match &item.kind {
            NodeKind::Scalar(s) if is_block_scalar(item) => {
                emit_block_scalar(
                    out,
                    &format!("{}- ", ws(indent)),
                    s,
                    indent,
                    item.line_comment.as_deref(),
                );
            }
            NodeKind::Scalar(s) => {
                let text = scalar_text(s, item.scalar_style, false);
                let line = if text.is_empty() {
                    format!("{}-", ws(indent))
                } else {
                    format!("{}- {}", ws(indent), text)
                };
                push_with_comment(out, line, item.line_comment.as_deref());
            }
            NodeKind::Mapping(map) if item.style == NodeStyle::Flow || map.is_empty() => {
                let line = format!("{}- {}", ws(indent), flow_text(item));
                push_with_comment(out, line, item.line_comment.as_deref());
            }
            NodeKind::Sequence(sub) if item.style == NodeStyle::Flow || sub.is_empty() => {
                let line = format!("{}- {}", ws(indent), flow_text(item));
                push_with_comment(out, line, item.line_comment.as_deref());
            }
            _ => emit_compact_item(out, item, indent),
        }
        push_comment_lines(out, indent, item.foot_comment.as_deref());
    }
}

/// Emit a block container item in compact form: the first line of the child
/// is glued onto the dash, the rest keeps its own indentation. Head comments
/// of the first child entry stay above the dash.
fn emit_compact_item(out: &mut Vec<String>, item: &Node, indent: usize) {
    let mut tmp: Vec<String> = Vec::new();
    match &item.kind {
        NodeKind::Mapping(_) => emit_entries(&mut tmp, item, indent + 1),
        NodeKind::Sequence(_) => emit_items(&mut tmp, item, indent + 1),
        NodeKind::Scalar(_) => {}
    }

    let anchor = tmp
        .iter()
        .position(|l| !l.trim_start().starts_with('#'))
        .unwrap_or(0);
    for line in &tmp[..anchor] {
        out.push(format!("{}{}", ws(indent), line.trim_start()));
    }
    for (i, line) in tmp[anchor..].iter().enumerate() {
        if i == 0 {
            out.push(format!("{}- {}", ws(indent), line.trim_start()));
        } else {
            out.push(line.clone());
        }
    }
}

fn is_block_scalar(node: &Node) -> bool {
    if let NodeKind::Scalar(s) = &node.kind {
        matches!(
            node.scalar_style,
            ScalarStyle::Literal | ScalarStyle::Folded
        ) && !s.repr.is_empty()
    } else {
        false
    }
}

/// Emit a literal block scalar. Folded originals also come through here;
/// the reconciler splices their original `>` form back when the value is
/// untouched.
fn emit_block_scalar(
    out: &mut Vec<String>,
    lead: &str,
    s: &Scalar,
    indent: usize,
    comment: Option<&str>,
) {
    let trailing = s.repr.len() - s.repr.trim_end_matches('\n').len();
    let chomp = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };
    let body = s.repr.trim_end_matches('\n');
    let lines: Vec<&str> = body.split('\n').collect();
    let indicator = if lines
        .first()
        .map_or(false, |l| l.starts_with(' ') || l.starts_with('\t'))
    {
        "2"
    } else {
        ""
    };

    push_with_comment(out, format!("{}|{}{}", lead, indicator, chomp), comment);
    for line in lines {
        if line.is_empty() {
            out.push(String::new());
        } else {
            out.push(format!("{}{}", ws(indent + 1), line));
        }
    }
    // `|+` keeps every trailing newline; show the extras as blank lines
    for _ in 1..trailing.max(1) {
        out.push(String::new());
    }
}

fn push_with_comment(out: &mut Vec<String>, line: String, comment: Option<&str>) {
    match comment {
        Some(c) => out.push(format!("{} {}", line, c)),
        None => out.push(line),
    }
}

fn push_comment_lines(out: &mut Vec<String>, indent: usize, comment: Option<&str>) {
    if let Some(text) = comment {
        for line in text.split('\n') {
            out.push(format!("{}{}", ws(indent), line));
        }
    }
}

// =============================================================================
// Flow and scalar text
// =============================================================================

/// Single-line flow rendering. Children render flow regardless of their own
/// style since block layout cannot nest inside flow.
pub fn flow_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Scalar(s) => scalar_text(s, node.scalar_style, true),
        NodeKind::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(flow_text).collect();
            format!("[{}]", parts.join(", "))
        }
        NodeKind::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", render_key(k, v.key_style), flow_text(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

fn scalar_text(s: &Scalar, style: ScalarStyle, flow: bool) -> String {
    match style {
        ScalarStyle::SingleQuoted => quote_single(&s.repr),
        ScalarStyle::DoubleQuoted => quote_double(&s.repr),
        // Block forms cannot appear inline; quote instead
        ScalarStyle::Literal | ScalarStyle::Folded => quote_single(&s.repr),
        ScalarStyle::Plain => {
            if s.kind == ScalarKind::Null && s.repr.is_empty() {
                String::new()
            } else if plain_safe(&s.repr, s.kind, flow) {
                s.repr.clone()
            } else {
                quote_single(&s.repr)
            }
        }
    }
}

fn render_key(key: &str, key_style: Option<ScalarStyle>) -> String {
    match key_style {
        Some(ScalarStyle::SingleQuoted) => quote_single(key),
        Some(ScalarStyle::DoubleQuoted) => quote_double(key),
        _ => {
            if key_safe(key) {
                key.to_string()
            } else {
                quote_single(key)
            }
        }
    }
}

/// Whether a string can stand as a plain scalar without changing meaning.
fn plain_safe(s: &str, kind: ScalarKind, flow: bool) -> bool {
    if !text_safe(s, flow) {
        return false;
    }
    // Keep strings typed as strings: quote anything that would re-resolve
    if kind == ScalarKind::Str && super::node::infer_kind(s) != ScalarKind::Str {
        return false;
    }
    true
}

fn key_safe(key: &str) -> bool {
    text_safe(key, false)
}

fn text_safe(s: &str, flow: bool) -> bool {
    if s.is_empty() || s != s.trim() {
        return false;
    }
    if s.contains('\n') || s.contains('\t') || s.chars().any(|c| c.is_control()) {
        return false;
    }
    let first = match s.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if "#&*!|>'\"%@`[]{},".contains(first) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') && (s.len() == 1 || s.as_bytes()[1] == b' ') {
        return false;
    }
    if s.contains(": ") || s.ends_with(':') || s.contains(" #") {
        return false;
    }
    if flow && s.chars().any(|c| "[]{},".contains(c)) {
        return false;
    }
    true
}

fn quote_single(s: &str) -> String {
    if s.contains('\n') || s.chars().any(|c| c.is_control()) {
        return quote_double(s);
    }
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// =============================================================================
// Raw value output
// =============================================================================

/// Raw output for a resolved value.
///
/// Scalars print without YAML formatting - strings bare, null empty.
/// Containers fall back to full YAML rendering.
pub fn raw_value_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() {
                ".nan".to_string()
            } else if f.is_infinite() {
                if f.is_sign_positive() {
                    ".inf".to_string()
                } else {
                    "-.inf".to_string()
                }
            } else {
                f.to_string()
            }
        }
        Value::Sequence(_) | Value::Mapping(_) => render(&value.to_node()),
    }
}

/// Strict YAML output for a resolved value, canonical formatting.
pub fn yaml_value_string(value: &Value) -> String {
    render(&value.to_node())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse::parse_document;
    use indoc::indoc;

    fn rendered(text: &str) -> String {
        render(&parse_document(text).unwrap().root)
    }

    // =========================================================================
    // Basic shapes
    // =========================================================================

    #[test]
    fn test_render_nested_mapping() {
        let got = rendered(indoc! {"
            server:
              host: localhost
              port: 8080
        "});
        assert_eq!(got, "server:\n  host: localhost\n  port: 8080");
    }

    #[test]
    fn test_render_sequence_indented_under_key() {
        let got = rendered("hosts:\n  - alpha\n  - beta\n");
        assert_eq!(got, "hosts:\n  - alpha\n  - beta");
    }

    #[test]
    fn test_render_compact_mapping_items() {
        let got = rendered(indoc! {"
            servers:
              - name: web1
                port: 80
              - name: web2
        "});
        assert_eq!(
            got,
            "servers:\n  - name: web1\n    port: 80\n  - name: web2"
        );
    }

    #[test]
    fn test_render_flow_styles_kept() {
        let got = rendered("items: [1, 2, 3]\nconfig: {a: 1, b: 2}\n");
        assert_eq!(got, "items: [1, 2, 3]\nconfig: {a: 1, b: 2}");
    }

    #[test]
    fn test_render_root_sequence() {
        assert_eq!(rendered("- a\n- b\n"), "- a\n- b");
    }

    #[test]
    fn test_render_empty_containers_inline() {
        let got = rendered("a: {}\nb: []\n");
        assert_eq!(got, "a: {}\nb: []");
    }

    #[test]
    fn test_render_null_value_bare_key() {
        assert_eq!(rendered("key:\n"), "key:");
        assert_eq!(rendered("key: null\n"), "key: null");
        assert_eq!(rendered("key: ~\n"), "key: ~");
    }

    // =========================================================================
    // Comments
    // =========================================================================

    #[test]
    fn test_render_comments_roundtrip() {
        let text = indoc! {"
            # head note
            name: alice # inline
            # foot note
        "};
        assert_eq!(rendered(text), "# head note\nname: alice # inline\n# foot note");
    }

    #[test]
    fn test_render_section_comment() {
        let got = rendered("section: # note\n  a: 1\n");
        assert_eq!(got, "section: # note\n  a: 1");
    }

    #[test]
    fn test_render_item_head_comment_above_dash() {
        let got = rendered(indoc! {"
            items:
              # pick me
              - name: x
        "});
        assert_eq!(got, "items:\n  # pick me\n  - name: x");
    }

    // =========================================================================
    // Quoting
    // =========================================================================

    #[test]
    fn test_render_preserves_quote_styles() {
        let got = rendered("a: 'x'\nb: \"y\"\nc: z\n");
        assert_eq!(got, "a: 'x'\nb: \"y\"\nc: z");
    }

    #[test]
    fn test_render_quotes_type_lookalikes() {
        let mut root = Node::mapping();
        root.as_mapping_mut().unwrap().insert(
            "v".to_string(),
            Node::scalar(Scalar::from_string("true")),
        );
        assert_eq!(render(&root), "v: 'true'");
    }

    #[test]
    fn test_render_quotes_specials() {
        let mut root = Node::mapping();
        let m = root.as_mapping_mut().unwrap();
        m.insert("a".to_string(), Node::scalar(Scalar::from_string("x: y")));
        m.insert("b".to_string(), Node::scalar(Scalar::from_string("#tag")));
        m.insert("c".to_string(), Node::scalar(Scalar::from_string("")));
        assert_eq!(render(&root), "a: 'x: y'\nb: '#tag'\nc: ''");
    }

    #[test]
    fn test_render_plain_colon_without_space_stays_plain() {
        assert_eq!(rendered("url: a:b\n"), "url: a:b");
    }

    #[test]
    fn test_render_double_quotes_for_newlines() {
        let mut root = Node::mapping();
        root.as_mapping_mut()
            .unwrap()
            .insert("v".to_string(), Node::scalar(Scalar::from_string("a\nb")));
        assert_eq!(render(&root), "v: \"a\\nb\"");
    }

    #[test]
    fn test_render_quoted_key_keeps_quotes() {
        assert_eq!(rendered("'on': push\n"), "'on': push");
        assert_eq!(rendered("\"a: b\": 1\n"), "\"a: b\": 1");
    }

    #[test]
    fn test_render_unsafe_new_key_gets_quoted() {
        let mut root = Node::mapping();
        root.as_mapping_mut()
            .unwrap()
            .insert("a: b".to_string(), Node::scalar(Scalar::int(1)));
        assert_eq!(render(&root), "'a: b': 1");
    }

    // =========================================================================
    // Block scalars
    // =========================================================================

    #[test]
    fn test_render_literal_block() {
        let got = rendered("script: |\n  echo one\n  echo two\n");
        assert_eq!(got, "script: |\n  echo one\n  echo two");
    }

    #[test]
    fn test_render_literal_block_strip_chomp() {
        let got = rendered("script: |-\n  echo one\n");
        assert_eq!(got, "script: |-\n  echo one");
    }

    #[test]
    fn test_render_folded_becomes_literal() {
        // Folded style has no naive form; the reconciler restores it
        let got = rendered("text: >-\n  a b\n");
        assert_eq!(got, "text: |-\n  a b");
    }

    #[test]
    fn test_render_literal_in_item() {
        let got = rendered("- |-\n  body\n");
        assert_eq!(got, "- |-\n  body");
    }

    // =========================================================================
    // Raw output
    // =========================================================================

    #[test]
    fn test_raw_value_string_scalars() {
        assert_eq!(raw_value_string(&Value::Null), "");
        assert_eq!(raw_value_string(&Value::from("text")), "text");
        assert_eq!(raw_value_string(&Value::from(true)), "true");
        assert_eq!(raw_value_string(&Value::from(42)), "42");
        assert_eq!(raw_value_string(&Value::from(f64::INFINITY)), ".inf");
    }

    #[test]
    fn test_raw_value_string_container() {
        let v: Value = vec![1i64, 2].into();
        assert_eq!(raw_value_string(&v), "- 1\n- 2");
    }
}
