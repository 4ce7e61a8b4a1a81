//! Plain values exchanged through the editing API.
//!
//! [`Value`] is what callers read out of a document and pass into edits. It
//! carries no formatting state; conversion to and from [`Node`] happens at
//! the facade boundary.

use indexmap::IndexMap;

use super::error::Error;
use super::node::{Node, NodeKind, Scalar, ScalarKind};
use super::parse;

/// A resolved YAML value without formatting annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Resolve a tree node to its plain value.
    pub fn from_node(node: &Node) -> Value {
        match &node.kind {
            NodeKind::Scalar(s) => Value::from_scalar(s),
            NodeKind::Sequence(items) => {
                Value::Sequence(items.iter().map(Value::from_node).collect())
            }
            NodeKind::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_node(v)))
                    .collect(),
            ),
        }
    }

    pub fn from_scalar(s: &Scalar) -> Value {
        match s.kind {
            ScalarKind::Null => Value::Null,
            ScalarKind::Bool => Value::Bool(scalar_bool(&s.repr)),
            ScalarKind::Int => match super::node::parse_int(&s.repr) {
                Some(i) => Value::Int(i),
                None => Value::String(s.repr.clone()),
            },
            ScalarKind::Float => Value::Float(scalar_float(&s.repr)),
            ScalarKind::Str => Value::String(s.repr.clone()),
        }
    }

    /// Build a fresh tree node for this value. Containers default to block
    /// style; the caller adjusts style afterwards where the document's
    /// formatting demands it.
    pub fn to_node(&self) -> Node {
        match self {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::scalar(Scalar::bool(*b)),
            Value::Int(i) => Node::scalar(Scalar::int(*i)),
            Value::Float(x) => Node::scalar(Scalar::float(*x)),
            Value::String(s) => Node::scalar(Scalar::from_string(s)),
            Value::Sequence(items) => {
                let mut node = Node::sequence();
                if let NodeKind::Sequence(v) = &mut node.kind {
                    v.extend(items.iter().map(Value::to_node));
                }
                node
            }
            Value::Mapping(map) => {
                let mut node = Node::mapping();
                if let NodeKind::Mapping(m) = &mut node.kind {
                    for (k, v) in map {
                        m.insert(k.clone(), v.to_node());
                    }
                }
                node
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable value type for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

/// Interpret an externally supplied value: a literal string by default,
/// parsed as YAML when requested.
pub fn parse_value(text: &str, yaml: bool) -> Result<Value, Error> {
    if !yaml {
        return Ok(Value::String(text.to_string()));
    }
    let parsed = parse::parse_document(text)?;
    Ok(Value::from_node(&parsed.root))
}

fn scalar_bool(repr: &str) -> bool {
    matches!(
        repr,
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON"
    )
}

fn scalar_float(repr: &str) -> f64 {
    match repr {
        ".inf" | "+.inf" | ".Inf" | ".INF" => f64::INFINITY,
        "-.inf" | "-.Inf" | "-.INF" => f64::NEG_INFINITY,
        ".nan" | ".NaN" | ".NAN" => f64::NAN,
        _ => repr.parse().unwrap_or(f64::NAN),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_node_resolves_scalars() {
        assert_eq!(
            Value::from_node(&Node::scalar(Scalar::from_plain("42"))),
            Value::Int(42)
        );
        assert_eq!(
            Value::from_node(&Node::scalar(Scalar::from_plain("yes"))),
            Value::Bool(true)
        );
        assert_eq!(
            Value::from_node(&Node::scalar(Scalar::from_plain("~"))),
            Value::Null
        );
        assert_eq!(
            Value::from_node(&Node::scalar(Scalar::from_string("42"))),
            Value::String("42".to_string())
        );
    }

    #[test]
    fn test_roundtrip_through_node() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::from("alice"));
        map.insert("age".to_string(), Value::from(30));
        let value = Value::Mapping(map);

        let node = value.to_node();
        assert_eq!(Value::from_node(&node), value);
    }

    #[test]
    fn test_sequence_from_vec() {
        let v: Value = vec![1i64, 2, 3].into();
        assert_eq!(
            v,
            Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_as_f64_accepts_ints() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::String("x".into()).as_f64(), None);
    }

    #[test]
    fn test_option_conversion() {
        let some: Value = Some(5i64).into();
        let none: Value = Option::<i64>::None.into();
        assert_eq!(some, Value::Int(5));
        assert_eq!(none, Value::Null);
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(scalar_float(".inf"), f64::INFINITY);
        assert_eq!(scalar_float("-.inf"), f64::NEG_INFINITY);
        assert!(scalar_float(".nan").is_nan());
    }
}
