//! Sequence editing operations.
//!
//! These work on the tree only; the document facade refreshes the raw text
//! after each successful mutation. Appending or inserting through a path
//! that does not exist yet creates a fresh flow-style sequence, so building
//! an array programmatically lands on compact `[...]` notation by default.

use log::trace;

use super::error::Error;
use super::node::{Node, NodeKind, NodeStyle};
use super::path::{self, Step};
use super::value::Value;

/// Resolve the sequence a path points at for reading.
fn resolve_seq<'a>(root: &'a Node, steps: &[Step], path: &str) -> Result<&'a Vec<Node>, Error> {
    let node = path::resolve(root, steps, path)?;
    node.as_sequence().ok_or_else(|| {
        Error::Type(format!(
            "invalid path '{}', expected a sequence, found {}.",
            path,
            node.type_name()
        ))
    })
}

/// Resolve the sequence a path points at for writing, creating a flow-style
/// empty sequence when the path is missing or holds a null placeholder.
fn resolve_seq_or_create<'a>(
    root: &'a mut Node,
    steps: &[Step],
    path: &str,
) -> Result<&'a mut Vec<Node>, Error> {
    let exists = path::resolve(root, steps, path).is_ok();
    let node = if exists {
        path::resolve_mut(root, steps, path)?
    } else {
        trace!("creating flow sequence at '{}'", path);
        path::resolve_or_create(root, steps, path)?
    };
    if node.is_null() || (!exists && node.is_mapping()) {
        *node = Node::sequence().with_style(NodeStyle::Flow);
    }
    let type_name = node.type_name();
    match &mut node.kind {
        NodeKind::Sequence(items) => Ok(items),
        _ => Err(Error::Type(format!(
            "invalid path '{}', expected a sequence, found {}.",
            path, type_name
        ))),
    }
}

fn check_bounds(index: usize, len: usize, path: &str) -> Result<(), Error> {
    if index >= len {
        return Err(Error::Index(format!(
            "invalid path '{}', index {} is out of range ({} elements in sequence).",
            path, index, len
        )));
    }
    Ok(())
}

/// Build the tree node for a new element. The element's own root style is
/// forced to block so a flow value pasted into a block sequence does not
/// carry stray brackets; the sequence's container style is reconciled
/// separately from the fingerprint.
fn element_node(value: Value) -> Node {
    let mut node = value.to_node();
    node.style = NodeStyle::Block;
    node
}

/// Append a value to the sequence at `path`, creating it when missing.
pub fn append(root: &mut Node, steps: &[Step], path: &str, value: Value) -> Result<(), Error> {
    let items = resolve_seq_or_create(root, steps, path)?;
    items.push(element_node(value));
    Ok(())
}

/// Insert a value at `index`; `index == len` appends.
pub fn insert(
    root: &mut Node,
    steps: &[Step],
    path: &str,
    index: usize,
    value: Value,
) -> Result<(), Error> {
    let items = resolve_seq_or_create(root, steps, path)?;
    if index > items.len() {
        return Err(Error::Index(format!(
            "invalid path '{}', index {} is out of range ({} elements in sequence).",
            path,
            index,
            items.len()
        )));
    }
    items.insert(index, element_node(value));
    Ok(())
}

/// Replace the element at `index`, keeping the old element's comments.
pub fn update(
    root: &mut Node,
    steps: &[Step],
    path: &str,
    index: usize,
    value: Value,
) -> Result<(), Error> {
    let node = path::resolve_mut(root, steps, path)?;
    let tname = node.type_name();
    let items = node.as_sequence_mut().ok_or_else(|| {
        Error::Type(format!(
            "invalid path '{}', expected a sequence, found {}.",
            path, tname
        ))
    })?;
    check_bounds(index, items.len(), path)?;
    let mut new = element_node(value);
    new.inherit_comments(&items[index]);
    items[index] = new;
    Ok(())
}

/// Remove and return the element at `index`.
pub fn remove(
    root: &mut Node,
    steps: &[Step],
    path: &str,
    index: usize,
) -> Result<Value, Error> {
    let node = path::resolve_mut(root, steps, path)?;
    let tname = node.type_name();
    let items = node.as_sequence_mut().ok_or_else(|| {
        Error::Type(format!(
            "invalid path '{}', expected a sequence, found {}.",
            path, tname
        ))
    })?;
    check_bounds(index, items.len(), path)?;
    Ok(Value::from_node(&items.remove(index)))
}

/// Read the element at `index`.
pub fn get(root: &Node, steps: &[Step], path: &str, index: usize) -> Result<Value, Error> {
    let items = resolve_seq(root, steps, path)?;
    check_bounds(index, items.len(), path)?;
    Ok(Value::from_node(&items[index]))
}

/// Number of elements in the sequence at `path`.
pub fn length(root: &Node, steps: &[Step], path: &str) -> Result<usize, Error> {
    Ok(resolve_seq(root, steps, path)?.len())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse::parse_document;
    use crate::yaml::path::parse_path;

    fn root(text: &str) -> Node {
        parse_document(text).unwrap().root
    }

    fn steps(path: &str) -> Vec<Step> {
        parse_path(path).unwrap()
    }

    #[test]
    fn test_append_existing() {
        let mut r = root("items: [1, 2]\n");
        append(&mut r, &steps("items"), "items", Value::Int(3)).unwrap();
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].as_scalar().unwrap().repr, "3");
    }

    #[test]
    fn test_append_creates_flow_sequence() {
        let mut r = root("a: 1\n");
        append(&mut r, &steps("tags"), "tags", Value::from("x")).unwrap();
        let tags = &r.as_mapping().unwrap()["tags"];
        assert_eq!(tags.style, NodeStyle::Flow);
        assert_eq!(tags.as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn test_append_converts_null() {
        let mut r = root("tags:\n");
        append(&mut r, &steps("tags"), "tags", Value::Int(1)).unwrap();
        assert!(r.as_mapping().unwrap()["tags"].is_sequence());
    }

    #[test]
    fn test_append_to_scalar_fails() {
        let mut r = root("x: 1\n");
        let err = append(&mut r, &steps("x"), "x", Value::Int(2)).unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_append_to_existing_mapping_fails() {
        let mut r = root("m:\n  a: 1\n");
        let err = append(&mut r, &steps("m"), "m", Value::Int(2)).unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_insert_at_len_appends() {
        let mut r = root("items: [1]\n");
        insert(&mut r, &steps("items"), "items", 1, Value::Int(2)).unwrap();
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        assert_eq!(items[1].as_scalar().unwrap().repr, "2");
    }

    #[test]
    fn test_insert_past_len_fails() {
        let mut r = root("items: [1]\n");
        let err = insert(&mut r, &steps("items"), "items", 3, Value::Int(2)).unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn test_insert_shifts_elements() {
        let mut r = root("items: [a, c]\n");
        insert(&mut r, &steps("items"), "items", 1, Value::from("b")).unwrap();
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        let reprs: Vec<&str> = items
            .iter()
            .map(|n| n.as_scalar().unwrap().repr.as_str())
            .collect();
        assert_eq!(reprs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_keeps_comments() {
        let mut r = root("items:\n  - old # note\n");
        update(&mut r, &steps("items"), "items", 0, Value::from("new")).unwrap();
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        assert_eq!(items[0].as_scalar().unwrap().repr, "new");
        assert_eq!(items[0].line_comment.as_deref(), Some("# note"));
    }

    #[test]
    fn test_update_out_of_range() {
        let mut r = root("items: [1]\n");
        let err = update(&mut r, &steps("items"), "items", 1, Value::Int(9)).unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn test_remove_returns_value() {
        let mut r = root("items: [1, 2, 3]\n");
        let v = remove(&mut r, &steps("items"), "items", 1).unwrap();
        assert_eq!(v, Value::Int(2));
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_get_bounds() {
        let r = root("items: [1]\n");
        assert_eq!(get(&r, &steps("items"), "items", 0).unwrap(), Value::Int(1));
        assert!(matches!(
            get(&r, &steps("items"), "items", 1).unwrap_err(),
            Error::Index(_)
        ));
    }

    #[test]
    fn test_get_missing_path() {
        let r = root("a: 1\n");
        assert!(matches!(
            get(&r, &steps("nope"), "nope", 0).unwrap_err(),
            Error::Path(_)
        ));
    }

    #[test]
    fn test_length() {
        let r = root("items: [1, 2, 3]\n");
        assert_eq!(length(&r, &steps("items"), "items").unwrap(), 3);
    }

    #[test]
    fn test_element_style_forced_block() {
        let mut r = root("items:\n  - a\n");
        append(&mut r, &steps("items"), "items", vec![1i64, 2].into()).unwrap();
        let items = r.as_mapping().unwrap()["items"].as_sequence().unwrap();
        assert_eq!(items[1].style, NodeStyle::Block);
    }
}
