//! Flow collection formatting passes.
//!
//! The canonical renderer always emits flow collections on one line with
//! `, ` separators. These passes put back what the source actually used:
//! bracket spacing for arrays, and for flow mappings the original text
//! itself, either spliced back verbatim when the content still matches or
//! patched value by value when only scalars changed.

use log::trace;

use super::fingerprint::{Fingerprint, FlowSpacing};
use super::scan::{self, LineKind, ScannedLine};

/// Reapply the recorded bracket spacing to single-line flow arrays.
pub fn respace_arrays(text: &str, fp: &Fingerprint) -> String {
    let scanned = scan::scan(text);
    let mut out: Vec<String> = text.split('\n').map(str::to_string).collect();

    for l in &scanned {
        if !matches!(l.kind, LineKind::Entry | LineKind::Item) {
            continue;
        }
        let Some(p) = &l.path else { continue };
        let Some(span) = fp.flow_spans.get(p.as_str()) else {
            continue;
        };
        if span.multiline || span.delimiter != '[' || span.spacing == FlowSpacing::Standard {
            continue;
        }
        let raw = &out[l.index];
        let Some(loc) = locate_span(raw) else { continue };
        if loc.delimiter != '[' {
            continue;
        }
        let respaced = respace(&raw[loc.start..=loc.end], span.spacing);
        let mut line = raw[..loc.start].to_string();
        line.push_str(&respaced);
        line.push_str(&raw[loc.end + 1..]);
        out[l.index] = line;
    }
    out.join("\n")
}

/// Reapply original text to flow mappings and multiline flow values.
///
/// A span whose content is unchanged is spliced back verbatim, comments and
/// line structure included. A single-line mapping whose keys still match gets
/// each changed value patched into the original text. Anything else keeps the
/// canonical rendering.
pub fn reapply_spans(text: &str, fp: &Fingerprint) -> String {
    let scanned = scan::scan(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for l in &scanned {
        let raw = lines[l.index];
        match reapply_line(l, raw, fp) {
            Some(replacement) => out.extend(replacement),
            None => out.push(raw.to_string()),
        }
    }
    out.join("\n")
}

fn reapply_line(l: &ScannedLine, raw: &str, fp: &Fingerprint) -> Option<Vec<String>> {
    if !matches!(l.kind, LineKind::Entry | LineKind::Item) {
        return None;
    }
    let p = l.path.as_ref()?;
    let span = fp.flow_spans.get(p.as_str())?;
    let loc = locate_span(raw)?;
    let rendered = &raw[loc.start..=loc.end];

    if span.multiline {
        if normalize_flow(rendered) != normalize_flow(&span.text) {
            trace!("multiline flow at '{}' changed, keeping canonical form", p);
            return None;
        }
        // The original span carries its own interior comments, so whatever
        // trails the rendered close bracket is dropped.
        let mut result = Vec::new();
        let mut span_lines = span.text.split('\n');
        let first = span_lines.next()?;
        result.push(format!("{}{}", &raw[..loc.start], first));
        for line in span_lines {
            result.push(line.to_string());
        }
        return Some(result);
    }

    if span.delimiter != '{' || loc.delimiter != '{' {
        return None;
    }
    if normalize_flow(rendered) == normalize_flow(&span.text) {
        let mut line = raw[..loc.start].to_string();
        line.push_str(&span.text);
        line.push_str(&raw[loc.end + 1..]);
        return Some(vec![line]);
    }
    let patched = patch_values(&span.text, rendered)?;
    trace!("patched flow mapping at '{}'", p);
    let mut line = raw[..loc.start].to_string();
    line.push_str(&patched);
    line.push_str(&raw[loc.end + 1..]);
    Some(vec![line])
}

struct SpanLocation {
    start: usize,
    end: usize,
    delimiter: char,
}

/// Byte range of the flow value on a rendered line, comment excluded.
fn locate_span(raw: &str) -> Option<SpanLocation> {
    let (ws, content) = scan::leading_ws(raw);
    let (body, _) = scan::comment_split(content);
    let voff = scan::value_offset(body);
    let bracket = voff + scan::skip_node_props(&body[voff..]);
    let delimiter = match body[bracket..].chars().next() {
        Some(c @ ('[' | '{')) => c,
        _ => return None,
    };
    let (_, close) = scan::top_level_commas(&body[bracket..])?;
    let start = ws.len() + bracket;
    Some(SpanLocation {
        start,
        end: start + close,
        delimiter,
    })
}

/// Rebuild a single-line flow array with the given spacing convention.
fn respace(text: &str, spacing: FlowSpacing) -> String {
    let Some((commas, close)) = scan::top_level_commas(text) else {
        return text.to_string();
    };
    let mut elements = Vec::new();
    let mut start = 1;
    for &c in &commas {
        elements.push(text[start..c].trim());
        start = c + 1;
    }
    let last = text[start..close].trim();
    if !last.is_empty() {
        elements.push(last);
    }
    if elements.is_empty() {
        return "[]".to_string();
    }
    match spacing {
        FlowSpacing::Spaced => format!("[ {} ]", elements.join(", ")),
        FlowSpacing::Compact => format!("[{}]", elements.join(",")),
        FlowSpacing::Standard => format!("[{}]", elements.join(", ")),
    }
}

/// Flow text reduced to its content: whitespace and comments dropped,
/// trailing commas removed, quoted text kept verbatim.
pub fn normalize_flow(text: &str) -> String {
    let mut out = String::new();
    let mut quote: Option<char> = None;
    let mut space = false;
    let mut comma = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if q == '\'' && c == '\'' {
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    quote = None;
                }
            } else if q == '"' {
                if c == '\\' {
                    if let Some(n) = chars.next() {
                        out.push(n);
                    }
                } else if c == '"' {
                    quote = None;
                }
            }
            continue;
        }
        if c.is_whitespace() {
            space = true;
            continue;
        }
        if c == '#' && (space || comma || out.is_empty()) {
            for n in chars.by_ref() {
                if n == '\n' {
                    break;
                }
            }
            space = true;
            continue;
        }
        if comma && !matches!(c, ']' | '}') {
            out.push(',');
        }
        comma = false;
        if c == ',' {
            comma = true;
            space = false;
            continue;
        }
        if matches!(c, '[' | ']' | '{' | '}' | ':') {
            space = false;
            out.push(c);
            continue;
        }
        if space && !out.is_empty() && !out.ends_with(['[', '{', ',', ':', ']', '}']) {
            out.push(' ');
        }
        space = false;
        if (c == '\'' || c == '"') && (out.is_empty() || out.ends_with(['[', '{', ',', ':'])) {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

struct Pair {
    key: String,
    value: String,
    value_span: (usize, usize),
}

/// Split a single-line flow mapping into key/value pairs with the byte span
/// of each value.
fn split_pairs(text: &str) -> Option<Vec<Pair>> {
    let (commas, close) = scan::top_level_commas(text)?;
    let mut bounds = Vec::new();
    let mut start = 1;
    for &c in &commas {
        bounds.push((start, c));
        start = c + 1;
    }
    bounds.push((start, close));

    let mut pairs = Vec::new();
    for (s, e) in bounds {
        let elem = &text[s..e];
        if elem.trim().is_empty() {
            continue;
        }
        let colon = flow_colon(elem)?;
        let key = normalize_flow(elem[..colon].trim());
        let after = &elem[colon + 1..];
        let lead = after.len() - after.trim_start().len();
        let trail = after.len() - after.trim_end().len();
        let vs = s + colon + 1 + lead;
        let ve = (e - trail).max(vs);
        pairs.push(Pair {
            key,
            value: text[vs..ve].to_string(),
            value_span: (vs, ve),
        });
    }
    Some(pairs)
}

/// First top-level colon that separates key from value in a flow pair.
fn flow_colon(elem: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = elem.char_indices().peekable();

    while let Some((pos, c)) = iter.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    if iter.peek().map(|&(_, n)| n) == Some('\'') {
                        iter.next();
                    } else {
                        quote = None;
                    }
                }
            }
            Some('"') => {
                if c == '\\' {
                    iter.next();
                } else if c == '"' {
                    quote = None;
                }
            }
            _ => match c {
                '\'' | '"' if matches!(prev, None | Some(' ') | Some('\t')) => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                ':' if depth == 0 => {
                    let next = iter.peek().map(|&(_, n)| n);
                    let after_quote = matches!(prev, Some('\'') | Some('"'));
                    if matches!(next, None | Some(' ') | Some('\t')) || after_quote {
                        return Some(pos);
                    }
                }
                _ => {}
            },
        }
        prev = Some(c);
    }
    None
}

/// Patch changed values from `rendered` into `original`, keeping the
/// original spacing and quoting of everything else. Fails when the key
/// sequences differ.
fn patch_values(original: &str, rendered: &str) -> Option<String> {
    let o = split_pairs(original)?;
    let r = split_pairs(rendered)?;
    if o.len() != r.len() {
        return None;
    }
    if o.iter().zip(&r).any(|(a, b)| a.key != b.key) {
        return None;
    }
    let mut out = String::new();
    let mut pos = 0;
    for (a, b) in o.iter().zip(&r) {
        out.push_str(&original[pos..a.value_span.0]);
        if normalize_flow(&a.value) == normalize_flow(&b.value) {
            out.push_str(&a.value);
        } else {
            out.push_str(&b.value);
        }
        pos = a.value_span.1;
    }
    out.push_str(&original[pos..]);
    Some(out)
}

// =============================================================================
// Unit Tests
// =============================================================================
