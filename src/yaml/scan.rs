//! Line-level scanning of YAML text.
//!
//! The formatting machinery never works on the event stream; it walks raw
//! lines, classifies each one, and tracks the path of every mapping entry and
//! sequence item it passes. Both the fingerprint extractor and the
//! reconciliation passes share this walker so they agree on what a line is
//! and which node it belongs to.

use super::path::escape_key;

/// Classification of one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// `---` document start marker
    DocStart,
    /// `...` document end marker
    DocEnd,
    /// `key: ...` mapping entry
    Entry,
    /// `- ...` sequence item
    Item,
    /// Later line of a flow value that spans lines
    FlowContinuation,
    /// Body line of a literal or folded block scalar
    BlockBody,
}

/// Trailing comment found on a content line.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineComment {
    /// Character column of the `#`
    pub col: usize,
    /// Spaces between the end of the content and the `#`
    pub gap: usize,
    /// Comment text including the `#`
    pub text: String,
}

/// One scanned line with its resolved location in the document.
#[derive(Debug, Clone)]
pub struct ScannedLine {
    pub index: usize,
    /// Literal leading whitespace
    pub ws: String,
    /// Leading whitespace width in characters
    pub indent: usize,
    pub kind: LineKind,
    /// Path of the sequence item starting on this line, if any
    pub item_path: Option<String>,
    /// Most specific path introduced on this line
    pub path: Option<String>,
    /// Mapping key introduced on this line, unquoted
    pub key: Option<String>,
    /// Content after the key colon or item dash, comment stripped
    pub value: String,
    pub comment: Option<InlineComment>,
}

impl ScannedLine {
    fn plain(index: usize, ws: &str, kind: LineKind) -> Self {
        ScannedLine {
            index,
            ws: ws.to_string(),
            indent: ws.chars().count(),
            kind,
            item_path: None,
            path: None,
            key: None,
            value: String::new(),
            comment: None,
        }
    }

    /// True when the value opens a literal or folded block scalar.
    pub fn has_block_header(&self) -> bool {
        matches!(self.value.chars().next(), Some('|') | Some('>'))
    }

    /// Path of the first construct on this line: the item for `- key: v`
    /// lines, the entry otherwise.
    pub fn line_path(&self) -> Option<&str> {
        self.item_path.as_deref().or(self.path.as_deref())
    }
}

/// Split a line's leading whitespace from its content.
pub fn leading_ws(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    line.split_at(end)
}

/// Find the trailing comment on a line, honoring quoting.
///
/// Returns the content part (trailing whitespace stripped) and the byte
/// position of the `#` when one starts a comment. A `#` only opens a comment
/// when preceded by whitespace or standing at the start of the content, and
/// quotes only open a quoted region at a token boundary, so apostrophes
/// inside plain scalars do not confuse the scan.
pub fn comment_split(line: &str) -> (&str, Option<usize>) {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = line.char_indices().peekable();

    while let Some((pos, c)) = iter.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    // '' is an escaped quote inside single-quoted text
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
                '\'' | '"' if token_boundary(prev) => quote = Some(c),
                '#' if matches!(prev, None | Some(' ') | Some('\t')) => {
                    return (line[..pos].trim_end(), Some(pos));
                }
                _ => {}
            },
        }
        prev = Some(c);
    }
    (line.trim_end(), None)
}

fn token_boundary(prev: Option<char>) -> bool {
    matches!(
        prev,
        None | Some(' ') | Some('\t') | Some('[') | Some('{') | Some(',') | Some(':') | Some('-')
    )
}

/// Net bracket depth change over a piece of text, quote-aware.
pub fn bracket_delta(text: &str) -> i32 {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = text.chars().peekable();

    while let Some(c) = iter.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    if iter.peek() == Some(&'\'') {
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
                '\'' | '"' if token_boundary(prev) => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                _ => {}
            },
        }
        prev = Some(c);
    }
    depth
}

/// Byte positions of commas at depth one inside a bracketed expression.
///
/// `text` must start at the opening bracket. Returns `None` when the
/// expression never closes on this text.
pub fn top_level_commas(text: &str) -> Option<(Vec<usize>, usize)> {
    let mut depth = 0i32;
    let mut commas = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

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
                '\'' | '"' if token_boundary(prev) => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((commas, pos));
                    }
                }
                ',' if depth == 1 => commas.push(pos),
                _ => {}
            },
        }
        prev = Some(c);
    }
    None
}

/// Find the top-level `key:` split of a content line.
///
/// Returns the byte position of the colon. Only a colon at bracket depth
/// zero, outside quotes, followed by whitespace or end of content counts.
pub fn key_colon(content: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = content.char_indices().peekable();

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
                '\'' | '"' if token_boundary(prev) => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                ':' if depth == 0 => {
                    let next = iter.peek().map(|&(_, n)| n);
                    if matches!(next, None | Some(' ') | Some('\t')) {
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

/// Byte offset of the value inside a content line, skipping item dashes and
/// the `key:` prefix. For a bare scalar line this is zero.
pub fn value_offset(content: &str) -> usize {
    let mut pos = 0;
    loop {
        let rest = &content[pos..];
        if rest == "-" {
            return content.len();
        }
        if rest.starts_with("- ") {
            pos += 1;
            while content[pos..].starts_with(' ') {
                pos += 1;
            }
            continue;
        }
        break;
    }
    if let Some(colon) = key_colon(&content[pos..]) {
        pos += colon + 1;
    }
    while content[pos..].starts_with(' ') {
        pos += 1;
    }
    pos
}

/// Column of the content after any item dashes on a scanned line: the key
/// column for entries, including compact `- key:` items.
pub fn content_col(l: &ScannedLine, raw: &str) -> usize {
    let content = &raw[l.ws.len()..];
    let mut pos = 0;
    while content[pos..].starts_with("- ") {
        pos += 1;
        while content[pos..].starts_with(' ') {
            pos += 1;
        }
    }
    l.indent + content[..pos].chars().count()
}

/// Byte offset past any leading `&anchor` / `!tag` tokens.
pub fn skip_node_props(text: &str) -> usize {
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        if rest.starts_with('&') || rest.starts_with('!') {
            match rest.find(|c: char| c.is_whitespace()) {
                Some(end) => {
                    pos += end;
                    while text[pos..].starts_with(' ') {
                        pos += 1;
                    }
                }
                None => return text.len(),
            }
        } else {
            return pos;
        }
    }
}

/// Strip quotes from a scalar token and undo its escapes.
pub fn unquote_scalar(token: &str) -> String {
    let token = token.trim();
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return token[1..token.len() - 1].replace("''", "'");
    }
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        let inner = &token[1..token.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        return out;
    }
    token.to_string()
}

// =============================================================================
// Path tracking walker
// =============================================================================

enum FrameSeg {
    Key(String),
    Seq { cur: Option<usize> },
}

struct Frame {
    indent: usize,
    seg: FrameSeg,
}

struct Tracker {
    frames: Vec<Frame>,
}

impl Tracker {
    fn new() -> Self {
        Tracker { frames: Vec::new() }
    }

    fn reset(&mut self) {
        self.frames.clear();
    }

    fn path(&self) -> String {
        let mut out = String::new();
        for frame in &self.frames {
            match &frame.seg {
                FrameSeg::Key(k) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(k);
                }
                FrameSeg::Seq { cur } => {
                    out.push('[');
                    if let Some(i) = cur {
                        out.push_str(&i.to_string());
                    }
                    out.push(']');
                }
            }
        }
        out
    }

    fn open_entry(&mut self, col: usize, key: &str) {
        while self.frames.last().map_or(false, |f| f.indent >= col) {
            self.frames.pop();
        }
        self.frames.push(Frame {
            indent: col,
            seg: FrameSeg::Key(escape_key(key)),
        });
    }

    /// Push a compact key found after an item dash; never pops, the dash
    /// handling already settled the stack.
    fn open_compact_entry(&mut self, col: usize, key: &str) {
        self.frames.push(Frame {
            indent: col,
            seg: FrameSeg::Key(escape_key(key)),
        });
    }

    fn advance_item(&mut self, col: usize, pop_deeper: bool) {
        if pop_deeper {
            while self.frames.last().map_or(false, |f| f.indent > col) {
                self.frames.pop();
            }
        }
        match self.frames.last_mut() {
            Some(Frame {
                indent,
                seg: FrameSeg::Seq { cur },
            }) if *indent == col => {
                *cur = Some(cur.map_or(0, |c| c + 1));
            }
            _ => self.frames.push(Frame {
                indent: col,
                seg: FrameSeg::Seq { cur: Some(0) },
            }),
        }
    }
}

/// Scan a document into classified lines with paths.
pub fn scan(text: &str) -> Vec<ScannedLine> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut tracker = Tracker::new();

    // Active multiline constructs
    let mut flow_depth = 0i32;
    let mut block_indent: Option<usize> = None;

    for (index, raw) in lines.iter().enumerate() {
        let (ws, content) = leading_ws(raw);

        if flow_depth > 0 {
            let (body, _) = comment_split(content);
            flow_depth += bracket_delta(body);
            out.push(ScannedLine::plain(index, ws, LineKind::FlowContinuation));
            continue;
        }

        if let Some(header) = block_indent {
            if content.is_empty() {
                // A blank run only belongs to the body if more body follows
                let still_body = lines[index + 1..].iter().find_map(|l| {
                    let (lws, lcontent) = leading_ws(l);
                    if lcontent.is_empty() {
                        None
                    } else {
                        Some(lws.chars().count() > header)
                    }
                });
                if still_body == Some(true) {
                    out.push(ScannedLine::plain(index, ws, LineKind::BlockBody));
                    continue;
                }
                block_indent = None;
            } else if ws.chars().count() > header {
                out.push(ScannedLine::plain(index, ws, LineKind::BlockBody));
                continue;
            } else {
                block_indent = None;
            }
        }

        if content.is_empty() {
            out.push(ScannedLine::plain(index, ws, LineKind::Blank));
            continue;
        }
        if content.starts_with('#') {
            let mut line = ScannedLine::plain(index, ws, LineKind::Comment);
            line.value = content.trim_end().to_string();
            out.push(line);
            continue;
        }
        if content.trim_end() == "---" {
            tracker.reset();
            out.push(ScannedLine::plain(index, ws, LineKind::DocStart));
            continue;
        }
        if content.trim_end() == "..." {
            tracker.reset();
            out.push(ScannedLine::plain(index, ws, LineKind::DocEnd));
            continue;
        }

        let (body, hash) = comment_split(content);
        let comment = hash.map(|pos| {
            let col = ws.chars().count() + content[..pos].chars().count();
            let gap = content[..pos].len() - content[..pos].trim_end().len();
            InlineComment {
                col,
                gap,
                text: content[pos..].trim_end().to_string(),
            }
        });

        let indent = ws.chars().count();
        let mut line = ScannedLine::plain(index, ws, LineKind::Entry);
        line.comment = comment;

        // Walk through any item dashes first; each one advances or opens a
        // sequence at its own column.
        let mut col = indent;
        let mut rest = body;
        let mut first_dash = true;
        let mut is_item = false;
        while rest == "-" || rest.starts_with("- ") {
            tracker.advance_item(col, first_dash);
            first_dash = false;
            is_item = true;
            let after = &rest[1..];
            let trimmed = after.trim_start();
            col += 1 + (after.chars().count() - trimmed.chars().count());
            rest = trimmed;
        }
        if is_item {
            line.kind = LineKind::Item;
            line.item_path = Some(tracker.path());
        }

        match key_colon(rest) {
            Some(pos) => {
                let key = unquote_scalar(&rest[..pos]);
                if is_item {
                    tracker.open_compact_entry(col, &key);
                } else {
                    tracker.open_entry(col, &key);
                }
                line.path = Some(tracker.path());
                line.key = Some(key);
                line.value = rest[pos + 1..].trim().to_string();
            }
            None if is_item => {
                line.path = line.item_path.clone();
                line.value = rest.to_string();
            }
            None => {
                // Bare scalar line: a root scalar document or a plain
                // multiline continuation.
                if tracker.frames.is_empty() && out.iter().all(not_content) {
                    line.value = rest.to_string();
                } else {
                    line.kind = LineKind::FlowContinuation;
                    out.push(line);
                    continue;
                }
            }
        }

        // Open multiline tracking for the value that starts here. A block
        // scalar body ends at the column of whatever owns the header: the
        // key for `key: |`, the dash for a bare `- |` item.
        if line.has_block_header() {
            block_indent = Some(if is_item && line.key.is_none() {
                line.indent
            } else {
                col
            });
        } else {
            let delta = bracket_delta(&line.value);
            if delta > 0 {
                flow_depth = delta;
            }
        }

        out.push(line);
    }

    out
}

fn not_content(line: &ScannedLine) -> bool {
    matches!(
        line.kind,
        LineKind::Blank | LineKind::Comment | LineKind::DocStart | LineKind::DocEnd
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn paths(text: &str) -> Vec<(usize, String)> {
        scan(text)
            .into_iter()
            .filter_map(|l| l.path.map(|p| (l.index, p)))
            .collect()
    }

    // =========================================================================
    // comment_split() tests
    // =========================================================================

    #[test]
    fn test_comment_split_simple() {
        let (content, hash) = comment_split("name: alice   # the user");
        assert_eq!(content, "name: alice");
        assert_eq!(hash, Some(14));
    }

    #[test]
    fn test_comment_split_hash_in_quotes() {
        let (content, hash) = comment_split("name: \"a # b\"");
        assert_eq!(content, "name: \"a # b\"");
        assert_eq!(hash, None);
    }

    #[test]
    fn test_comment_split_apostrophe_in_plain() {
        // A mid-word apostrophe must not open a quoted region
        let (content, hash) = comment_split("note: it's here # yes");
        assert_eq!(content, "note: it's here");
        assert!(hash.is_some());
    }

    #[test]
    fn test_comment_split_hash_without_space() {
        let (content, hash) = comment_split("tag: a#b");
        assert_eq!(content, "tag: a#b");
        assert_eq!(hash, None);
    }

    #[test]
    fn test_comment_split_full_line() {
        let (content, hash) = comment_split("# only a comment");
        assert_eq!(content, "");
        assert_eq!(hash, Some(0));
    }

    // =========================================================================
    // key_colon() / helpers
    // =========================================================================

    #[test]
    fn test_key_colon_plain() {
        assert_eq!(key_colon("name: alice"), Some(4));
        assert_eq!(key_colon("name:"), Some(4));
    }

    #[test]
    fn test_key_colon_url_value() {
        // First colon is not followed by space, second one splits
        assert_eq!(key_colon("a:b: c"), Some(3));
        assert_eq!(key_colon("http://example.com"), None);
    }

    #[test]
    fn test_key_colon_quoted_key() {
        assert_eq!(key_colon("\"my: key\": v"), Some(9));
    }

    #[test]
    fn test_key_colon_inside_flow() {
        // Colons inside brackets belong to the flow value
        assert_eq!(key_colon("[a: 1, b: 2]"), None);
    }

    #[test]
    fn test_bracket_delta() {
        assert_eq!(bracket_delta("[1, 2]"), 0);
        assert_eq!(bracket_delta("{a: [1,"), 2);
        assert_eq!(bracket_delta("]}"), -2);
        assert_eq!(bracket_delta("'[['"), 0);
    }

    #[test]
    fn test_top_level_commas() {
        let (commas, close) = top_level_commas("[a, [b, c], d]").unwrap();
        assert_eq!(commas, vec![2, 10]);
        assert_eq!(close, 13);
        assert!(top_level_commas("[a, b").is_none());
    }

    #[test]
    fn test_unquote_scalar() {
        assert_eq!(unquote_scalar("'it''s'"), "it's");
        assert_eq!(unquote_scalar("\"a\\nb\""), "a\nb");
        assert_eq!(unquote_scalar("plain"), "plain");
    }

    #[test]
    fn test_value_offset() {
        assert_eq!(value_offset("key: value"), 5);
        assert_eq!(value_offset("key:"), 4);
        assert_eq!(value_offset("- item"), 2);
        assert_eq!(value_offset("- key: [1, 2]"), 7);
        assert_eq!(value_offset("- - a"), 4);
        assert_eq!(value_offset("bare scalar"), 0);
        assert_eq!(value_offset("-"), 1);
    }

    #[test]
    fn test_skip_node_props() {
        assert_eq!(skip_node_props("&anchor [1, 2]"), 8);
        assert_eq!(skip_node_props("!tag {a: 1}"), 5);
        assert_eq!(skip_node_props("&a !t value"), 6);
        assert_eq!(skip_node_props("[1, 2]"), 0);
    }

    // =========================================================================
    // scan() path tracking
    // =========================================================================

    #[test]
    fn test_scan_nested_mapping_paths() {
        let text = indoc! {"
            general:
              resources:
                cpu: 512
            test:
              resources:
                cpu: 128
        "};
        let got = paths(text);
        assert_eq!(
            got,
            vec![
                (0, "general".to_string()),
                (1, "general.resources".to_string()),
                (2, "general.resources.cpu".to_string()),
                (3, "test".to_string()),
                (4, "test.resources".to_string()),
                (5, "test.resources.cpu".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_sequence_paths() {
        let text = indoc! {"
            servers:
              - name: web1
                port: 80
              - name: web2
        "};
        let got = paths(text);
        assert_eq!(
            got,
            vec![
                (0, "servers".to_string()),
                (1, "servers[0].name".to_string()),
                (2, "servers[0].port".to_string()),
                (3, "servers[1].name".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_zero_indent_sequence() {
        let text = indoc! {"
            hosts:
            - alpha
            - beta
            next: 1
        "};
        let got = paths(text);
        assert_eq!(
            got,
            vec![
                (0, "hosts".to_string()),
                (1, "hosts[0]".to_string()),
                (2, "hosts[1]".to_string()),
                (3, "next".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_nested_dashes() {
        let text = "- - a\n  - b\n";
        let got = paths(text);
        assert_eq!(
            got,
            vec![(0, "[0][0]".to_string()), (1, "[0][1]".to_string())]
        );
    }

    #[test]
    fn test_scan_flow_continuation() {
        let text = indoc! {"
            config: {
              a: 1,
            }
            next: 2
        "};
        let scanned = scan(text);
        assert_eq!(scanned[0].kind, LineKind::Entry);
        assert_eq!(scanned[1].kind, LineKind::FlowContinuation);
        assert_eq!(scanned[2].kind, LineKind::FlowContinuation);
        assert_eq!(scanned[3].kind, LineKind::Entry);
        assert_eq!(scanned[3].path.as_deref(), Some("next"));
    }

    #[test]
    fn test_scan_block_scalar_body() {
        let text = indoc! {"
            script: |
              echo hi
              # not a comment
            next: 1
        "};
        let scanned = scan(text);
        assert_eq!(scanned[1].kind, LineKind::BlockBody);
        assert_eq!(scanned[2].kind, LineKind::BlockBody);
        assert_eq!(scanned[3].kind, LineKind::Entry);
    }

    #[test]
    fn test_scan_blank_after_block_scalar() {
        let text = indoc! {"
            script: |
              echo hi

            next: 1
        "};
        let scanned = scan(text);
        assert_eq!(scanned[2].kind, LineKind::Blank);
        assert_eq!(scanned[3].kind, LineKind::Entry);
    }

    #[test]
    fn test_scan_doc_markers_and_comments() {
        let text = "---\n# top\nkey: 1\n...\n";
        let scanned = scan(text);
        assert_eq!(scanned[0].kind, LineKind::DocStart);
        assert_eq!(scanned[1].kind, LineKind::Comment);
        assert_eq!(scanned[2].kind, LineKind::Entry);
        assert_eq!(scanned[3].kind, LineKind::DocEnd);
    }

    #[test]
    fn test_scan_inline_comment_gap() {
        let scanned = scan("cpu: 512   # in millicores\n");
        let c = scanned[0].comment.as_ref().unwrap();
        assert_eq!(c.gap, 3);
        assert_eq!(c.col, 11);
        assert_eq!(c.text, "# in millicores");
        assert_eq!(scanned[0].value, "512");
    }

    #[test]
    fn test_scan_escaped_key_in_path() {
        let got = paths("a.b: 1\n");
        assert_eq!(got, vec![(0, "a\\.b".to_string())]);
    }

    #[test]
    fn test_scan_compact_item_block_scalar() {
        let text = indoc! {"
            - text: |
                body
              other: 1
        "};
        let scanned = scan(text);
        assert_eq!(scanned[1].kind, LineKind::BlockBody);
        assert_eq!(scanned[2].kind, LineKind::Entry);
        assert_eq!(scanned[2].path.as_deref(), Some("[0].other"));
    }
}
