//! Deep merge of one document tree into another.
//!
//! Mappings merge recursively, sequences append with duplicates moved to the
//! overlay's position, scalars replace. A null overlay value deletes the
//! matching base key. Per-path policies override the defaults; specs come
//! from the command line in `PATH=POLICY` form. Comments on kept base nodes
//! survive; a replaced value inherits the base node's comments when the
//! overlay brings none of its own.

use std::collections::HashMap;

use log::trace;

use super::error::Error;
use super::node::{Node, NodeKind};
use super::value::Value;

/// Merge policy for specific paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergePolicy {
    /// Deep recursive merge (default)
    Merge,
    /// Replace entirely with the overlay value
    Replace,
    /// Prepend the overlay sequence to the base sequence
    Prepend,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(MergePolicy::Merge),
            "replace" => Ok(MergePolicy::Replace),
            "prepend" => Ok(MergePolicy::Prepend),
            _ => Err(format!(
                "Invalid merge policy '{}': expected merge, replace, or prepend",
                s
            )),
        }
    }
}

/// Parse merge policy specifications from CLI arguments.
/// Format: "path=policy" where policy is merge|replace|prepend.
pub fn parse_merge_policies(
    specs: &[String],
) -> Result<HashMap<String, MergePolicy>, Error> {
    let mut policies = HashMap::new();
    for spec in specs {
        let parts: Vec<&str> = spec.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(Error::InvalidPath(format!(
                "Invalid merge policy '{}': expected format PATH=POLICY",
                spec
            )));
        }
        let policy: MergePolicy = parts[1].trim().parse().map_err(Error::InvalidPath)?;
        policies.insert(parts[0].trim().to_string(), policy);
    }
    Ok(policies)
}

/// Whether two nodes hold the same content, formatting aside.
fn same_content(a: &Node, b: &Node) -> bool {
    Value::from_node(a) == Value::from_node(b)
}

fn location(path: &str) -> String {
    if path.is_empty() {
        "at root".to_string()
    } else {
        format!("at '{}'", path)
    }
}

/// Merge `overlay` into `base` in place.
pub fn merge_nodes(
    base: &mut Node,
    overlay: &Node,
    path: &str,
    policies: &HashMap<String, MergePolicy>,
) -> Result<(), Error> {
    let policy = policies.get(path).copied().unwrap_or(MergePolicy::Merge);
    match policy {
        MergePolicy::Replace => {
            trace!("replace policy {}", location(path));
            replace_node(base, overlay);
            Ok(())
        }
        MergePolicy::Prepend => {
            prepend_nodes(base, overlay);
            Ok(())
        }
        MergePolicy::Merge => default_merge(base, overlay, path, policies),
    }
}

fn replace_node(base: &mut Node, overlay: &Node) {
    let old = std::mem::replace(base, overlay.clone());
    base.inherit_presentation(&old);
}

fn prepend_nodes(base: &mut Node, overlay: &Node) {
    match (&mut base.kind, &overlay.kind) {
        (NodeKind::Sequence(base_seq), NodeKind::Sequence(overlay_seq)) => {
            let mut result = overlay_seq.clone();
            for elt in base_seq.drain(..) {
                if !result.iter().any(|o| same_content(o, &elt)) {
                    result.push(elt);
                }
            }
            *base_seq = result;
        }
        // Prepend only means something for two sequences; otherwise it
        // degrades to replace, like an explicit overlay value would.
        _ => replace_node(base, overlay),
    }
}

fn default_merge(
    base: &mut Node,
    overlay: &Node,
    path: &str,
    policies: &HashMap<String, MergePolicy>,
) -> Result<(), Error> {
    if overlay.is_null() {
        // Null deletion is handled one level up, at the mapping entry; a
        // bare null overlay elsewhere leaves the base value alone.
        return Ok(());
    }
    if base.is_null() {
        replace_node(base, overlay);
        return Ok(());
    }

    match (&mut base.kind, &overlay.kind) {
        (NodeKind::Mapping(base_map), NodeKind::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    trace!("merge deletes '{}' {}", key, location(path));
                    base_map.shift_remove(key);
                    continue;
                }
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match base_map.get_mut(key) {
                    Some(base_value) => {
                        merge_nodes(base_value, overlay_value, &child_path, policies)?
                    }
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Ok(())
        }

        (NodeKind::Sequence(base_seq), NodeKind::Sequence(overlay_seq)) => {
            for elt in overlay_seq {
                if let Some(pos) = base_seq.iter().position(|b| same_content(b, elt)) {
                    base_seq.remove(pos);
                }
                base_seq.push(elt.clone());
            }
            Ok(())
        }

        (NodeKind::Scalar(_), NodeKind::Scalar(_)) => {
            replace_node(base, overlay);
            Ok(())
        }

        _ => Err(Error::Type(format!(
            "Type mismatch {}: cannot merge {} with {}",
            location(path),
            base.type_name(),
            overlay.type_name()
        ))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse::parse_document;
    use indoc::indoc;

    fn merged(base: &str, overlay: &str) -> Node {
        merged_with(base, overlay, &HashMap::new())
    }

    fn merged_with(base: &str, overlay: &str, policies: &HashMap<String, MergePolicy>) -> Node {
        let mut b = parse_document(base).unwrap().root;
        let o = parse_document(overlay).unwrap().root;
        merge_nodes(&mut b, &o, "", policies).unwrap();
        b
    }

    fn repr<'a>(node: &'a Node, key: &str) -> &'a str {
        &node.as_mapping().unwrap()[key].as_scalar().unwrap().repr
    }

    #[test]
    fn test_merge_scalar_replaces() {
        let root = merged("a: 1\nb: 2\n", "a: 9\n");
        assert_eq!(repr(&root, "a"), "9");
        assert_eq!(repr(&root, "b"), "2");
    }

    #[test]
    fn test_merge_recursive_mapping() {
        let root = merged(
            indoc! {"
                server:
                  host: old
                  port: 80
            "},
            "server:\n  host: new\n",
        );
        let server = &root.as_mapping().unwrap()["server"];
        assert_eq!(repr(server, "host"), "new");
        assert_eq!(repr(server, "port"), "80");
    }

    #[test]
    fn test_merge_null_deletes_key() {
        let root = merged("a: 1\nb: 2\n", "a: null\n");
        let map = root.as_mapping().unwrap();
        assert!(!map.contains_key("a"));
        assert!(map.contains_key("b"));
    }

    #[test]
    fn test_merge_new_key_appended() {
        let root = merged("a: 1\n", "b: 2\n");
        let keys: Vec<&String> = root.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_sequences_append_dedupe() {
        let root = merged("items: [a, b]\n", "items: [b, c]\n");
        let items = root.as_mapping().unwrap()["items"].as_sequence().unwrap();
        let reprs: Vec<&str> = items
            .iter()
            .map(|n| n.as_scalar().unwrap().repr.as_str())
            .collect();
        assert_eq!(reprs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_replace_policy() {
        let mut policies = HashMap::new();
        policies.insert("server".to_string(), MergePolicy::Replace);
        let root = merged_with(
            "server:\n  host: old\n  port: 80\n",
            "server:\n  host: new\n",
            &policies,
        );
        let server = root.as_mapping().unwrap()["server"].as_mapping().unwrap();
        assert!(!server.contains_key("port"));
    }

    #[test]
    fn test_merge_prepend_policy() {
        let mut policies = HashMap::new();
        policies.insert("items".to_string(), MergePolicy::Prepend);
        let root = merged_with("items: [a, b]\n", "items: [x, b]\n", &policies);
        let items = root.as_mapping().unwrap()["items"].as_sequence().unwrap();
        let reprs: Vec<&str> = items
            .iter()
            .map(|n| n.as_scalar().unwrap().repr.as_str())
            .collect();
        assert_eq!(reprs, vec!["x", "b", "a"]);
    }

    #[test]
    fn test_merge_type_mismatch() {
        let mut b = parse_document("a:\n  x: 1\n").unwrap().root;
        let o = parse_document("a: [1]\n").unwrap().root;
        let err = merge_nodes(&mut b, &o, "", &HashMap::new()).unwrap_err();
        match err {
            Error::Type(msg) => assert!(msg.contains("cannot merge mapping with sequence")),
            _ => panic!("Expected Error::Type"),
        }
    }

    #[test]
    fn test_merge_keeps_base_comments() {
        let root = merged("a: 1 # keep me\n", "a: 9\n");
        let a = &root.as_mapping().unwrap()["a"];
        assert_eq!(a.line_comment.as_deref(), Some("# keep me"));
    }

    #[test]
    fn test_merge_overlay_comment_wins() {
        let root = merged("a: 1 # old\n", "a: 9 # new\n");
        let a = &root.as_mapping().unwrap()["a"];
        assert_eq!(a.line_comment.as_deref(), Some("# new"));
    }

    #[test]
    fn test_merge_into_null_base() {
        let root = merged("a:\n", "a:\n  x: 1\n");
        assert!(root.as_mapping().unwrap()["a"].is_mapping());
    }

    #[test]
    fn test_parse_merge_policies() {
        let specs = vec!["a.b=replace".to_string(), "c=prepend".to_string()];
        let policies = parse_merge_policies(&specs).unwrap();
        assert_eq!(policies["a.b"], MergePolicy::Replace);
        assert_eq!(policies["c"], MergePolicy::Prepend);
    }

    #[test]
    fn test_parse_merge_policies_malformed() {
        assert!(parse_merge_policies(&["nopolicy".to_string()]).is_err());
        assert!(parse_merge_policies(&["a=weird".to_string()]).is_err());
    }
}
