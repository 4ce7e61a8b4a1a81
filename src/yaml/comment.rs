//! Inline comment alignment.

use super::fingerprint::Fingerprint;
use super::scan::{self, LineKind};

/// How trailing comments are treated when a document is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    /// Keep each comment at its original distance from the content
    #[default]
    Relative,
    /// Pad every `#` to a fixed one-based character column
    Absolute(usize),
    /// Drop trailing comments from the output
    Disabled,
}

/// Re-pad or strip trailing comments on content lines according to `mode`.
/// The tree keeps its comment text either way; this only shapes the output.
pub fn align_comments(text: &str, fp: &Fingerprint, mode: CommentMode) -> String {
    let scanned = scan::scan(text);
    let mut out: Vec<String> = text.split('\n').map(str::to_string).collect();

    for l in &scanned {
        if !matches!(l.kind, LineKind::Entry | LineKind::Item) {
            continue;
        }
        if l.comment.is_none() {
            continue;
        }
        let Some(p) = &l.path else { continue };
        let raw = &out[l.index];
        let (ws, content) = scan::leading_ws(raw);
        let (body, hash) = scan::comment_split(content);
        let Some(pos) = hash else { continue };
        let comment = content[pos..].trim_end();
        let base = format!("{}{}", ws, body);
        let gap = match mode {
            CommentMode::Disabled => {
                out[l.index] = base;
                continue;
            }
            CommentMode::Relative => fp.comment_gaps.get(p.as_str()).copied().unwrap_or(1),
            CommentMode::Absolute(col) => {
                let width = base.chars().count();
                col.saturating_sub(1).saturating_sub(width).max(1)
            }
        };
        out[l.index] = format!("{}{}{}", base, " ".repeat(gap), comment);
    }
    out.join("\n")
}

// =============================================================================
// Unit Tests
// =============================================================================
