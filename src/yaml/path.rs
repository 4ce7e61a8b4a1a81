//! Path handling for YAML navigation.
//!
//! Paths are dot-separated segments with optional bracket indices, e.g.
//! `servers[0].host` or `a.b\.c.d`. Escape sequences: `\.` for a literal dot,
//! `\\` for a literal backslash. Bracket indices are non-negative; numeric
//! dot segments (`items.0`, `items.-1`) are also accepted on sequences for
//! compatibility with shell usage.

use super::error::Error;
use super::node::{Node, NodeKind};

/// One resolved step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Split a dot-notation path into its raw segments.
///
/// Handles escape sequences: `\.` for literal dots, `\\` for literal
/// backslashes. For example, `a.b\.c.d` becomes `["a", "b.c", "d"]`.
fn split_segments(path: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut escaped = false;
    let mut element = String::new();

    for c in path.chars() {
        if escaped {
            escaped = false;
            element.push(c);
            continue;
        }
        match c {
            '\\' => escaped = true,
            '.' => {
                elements.push(element.clone());
                element.clear();
            }
            _ => element.push(c),
        }
    }
    elements.push(element);
    elements
}

/// Parse a path string into steps.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for unterminated or non-numeric bracket
/// groups, or for text following a bracket group within one segment.
pub fn parse_path(path: &str) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    for segment in split_segments(path) {
        push_segment(&segment, path, &mut steps)?;
    }
    Ok(steps)
}

fn push_segment(segment: &str, path: &str, steps: &mut Vec<Step>) -> Result<(), Error> {
    match segment.find('[') {
        None => steps.push(Step::Key(segment.to_string())),
        Some(0) => push_index_groups(segment, path, steps)?,
        Some(pos) => {
            steps.push(Step::Key(segment[..pos].to_string()));
            push_index_groups(&segment[pos..], path, steps)?;
        }
    }
    Ok(())
}

fn push_index_groups(groups: &str, path: &str, steps: &mut Vec<Step>) -> Result<(), Error> {
    let mut rest = groups;
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(Error::InvalidPath(format!(
                "invalid path '{}', unexpected '{}' after index.",
                path, rest
            )));
        }
        let close = rest.find(']').ok_or_else(|| {
            Error::InvalidPath(format!("invalid path '{}', unterminated index.", path))
        })?;
        let body = &rest[1..close];
        let idx: usize = body.parse().map_err(|_| {
            Error::InvalidPath(format!(
                "invalid path '{}', malformed index '[{}]'.",
                path, body
            ))
        })?;
        steps.push(Step::Index(idx));
        rest = &rest[close + 1..];
    }
    Ok(())
}

/// Escape a key for embedding in a path string.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c == '\\' || c == '.' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Join steps back into the canonical path string.
///
/// This is the inverse of [`parse_path`] and the format used to key
/// formatting data by location.
pub fn join_steps(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(&escape_key(k));
            }
            Step::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Path of the sequence owning an item path: `hosts[2]` -> `hosts`.
///
/// Returns None for root sequence items and nested index steps, where the
/// owner is not a mapping entry.
pub fn seq_owner(item_path: &str) -> Option<&str> {
    let pos = item_path.rfind('[')?;
    let prefix = &item_path[..pos];
    if prefix.is_empty() || prefix.ends_with(']') {
        None
    } else {
        Some(prefix)
    }
}

/// Resolve a string index to an actual index in a sequence.
///
/// Handles:
/// - Positive indices (0, 1, 2, ...)
/// - Negative indices (-1 = last, -2 = second to last, ...)
///
/// # Errors
///
/// Returns [`Error::Type`] if the index is not a valid integer and
/// [`Error::Index`] if it is out of range for the sequence length.
pub fn resolve_index(part: &str, len: usize, full_path: &str) -> Result<usize, Error> {
    let idx: i64 = part.parse().map_err(|_| {
        Error::Type(format!(
            "invalid path '{}', non-integer index '{}' provided on a sequence.",
            full_path, part
        ))
    })?;

    let resolved = if idx < 0 {
        let abs_idx = (-idx) as usize;
        if abs_idx > len {
            return Err(Error::Index(format!(
                "invalid path '{}', index {} is out of range ({} elements in sequence).",
                full_path, idx, len
            )));
        }
        len - abs_idx
    } else {
        idx as usize
    };

    if resolved >= len {
        return Err(Error::Index(format!(
            "invalid path '{}', index {} is out of range ({} elements in sequence).",
            full_path, idx, len
        )));
    }

    Ok(resolved)
}

fn check_index(idx: usize, len: usize, full_path: &str) -> Result<usize, Error> {
    if idx >= len {
        return Err(Error::Index(format!(
            "invalid path '{}', index {} is out of range ({} elements in sequence).",
            full_path, idx, len
        )));
    }
    Ok(idx)
}

/// Walk the tree to the node a path points at.
pub fn resolve<'a>(root: &'a Node, steps: &[Step], path: &str) -> Result<&'a Node, Error> {
    let mut current = root;
    for step in steps {
        let tname = current.type_name();
        current = match step {
            Step::Key(key) => match &current.kind {
                NodeKind::Mapping(map) => map.get(key).ok_or_else(|| {
                    Error::Path(format!(
                        "invalid path '{}', missing key '{}' in mapping.",
                        path, key
                    ))
                })?,
                NodeKind::Sequence(seq) => {
                    let idx = resolve_index(key, seq.len(), path)?;
                    &seq[idx]
                }
                NodeKind::Scalar(_) => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot traverse {} at '{}'.",
                        path, tname, key
                    )));
                }
            },
            Step::Index(idx) => match &current.kind {
                NodeKind::Sequence(seq) => &seq[check_index(*idx, seq.len(), path)?],
                _ => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot index into {} with '[{}]'.",
                        path, tname, idx
                    )));
                }
            },
        };
    }
    Ok(current)
}

/// Walk the tree to the node a path points at, mutably.
pub fn resolve_mut<'a>(root: &'a mut Node, steps: &[Step], path: &str) -> Result<&'a mut Node, Error> {
    let mut current = root;
    for step in steps {
        let tname = current.type_name();
        current = match step {
            Step::Key(key) => match &mut current.kind {
                NodeKind::Mapping(map) => map.get_mut(key).ok_or_else(|| {
                    Error::Path(format!(
                        "invalid path '{}', missing key '{}' in mapping.",
                        path, key
                    ))
                })?,
                NodeKind::Sequence(seq) => {
                    let idx = resolve_index(key, seq.len(), path)?;
                    &mut seq[idx]
                }
                NodeKind::Scalar(_) => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot traverse {} at '{}'.",
                        path, tname, key
                    )));
                }
            },
            Step::Index(idx) => match &mut current.kind {
                NodeKind::Sequence(seq) => {
                    let idx = check_index(*idx, seq.len(), path)?;
                    &mut seq[idx]
                }
                _ => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot index into {} with '[{}]'.",
                        path, tname, idx
                    )));
                }
            },
        };
    }
    Ok(current)
}

/// Walk the tree to a path, creating what is missing along the way.
///
/// Missing mapping keys are created as empty mappings, sequences grow with
/// empty mapping placeholders up to a requested index, and null scalars are
/// converted to the container the next step needs. Traversing any other
/// scalar is still a type error.
pub fn resolve_or_create<'a>(
    root: &'a mut Node,
    steps: &[Step],
    path: &str,
) -> Result<&'a mut Node, Error> {
    let mut current = root;
    for step in steps {
        if current.is_null() {
            current.kind = match step {
                Step::Key(_) => NodeKind::Mapping(Default::default()),
                Step::Index(_) => NodeKind::Sequence(Vec::new()),
            };
        }
        let tname = current.type_name();
        current = match step {
            Step::Key(key) => match &mut current.kind {
                NodeKind::Mapping(map) => map.entry(key.clone()).or_insert_with(Node::mapping),
                NodeKind::Sequence(seq) => {
                    let idx = resolve_index(key, seq.len(), path)?;
                    &mut seq[idx]
                }
                NodeKind::Scalar(_) => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot traverse {} at '{}'.",
                        path, tname, key
                    )));
                }
            },
            Step::Index(idx) => match &mut current.kind {
                NodeKind::Sequence(seq) => {
                    while seq.len() <= *idx {
                        seq.push(Node::mapping());
                    }
                    &mut seq[*idx]
                }
                _ => {
                    return Err(Error::Type(format!(
                        "invalid path '{}', cannot index into {} with '[{}]'.",
                        path, tname, idx
                    )));
                }
            },
        };
    }
    Ok(current)
}

// =============================================================================
// Unit Tests
// =============================================================================
