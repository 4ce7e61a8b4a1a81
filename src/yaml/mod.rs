//! Format-preserving YAML editing.
//!
//! The pipeline splits a document into two representations: a structural
//! tree of [`Node`]s and a formatting [`fingerprint`] extracted from the raw
//! text. Edits touch the tree; serialization renders the tree canonically
//! and then reconciles the result against the fingerprint so untouched lines
//! come back byte-for-byte.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for parse, path, type and index failures
//! - [`node`]: The tree representation and per-node presentation hints
//! - [`value`]: Plain values crossing the public API boundary
//! - [`path`]: Dotted-path parsing and traversal
//! - [`parse`]: Event-stream parsing with comment attachment
//! - [`scan`]: Shared line-walking helpers for the text passes
//! - [`render`]: Canonical two-space rendering of a tree
//! - [`fingerprint`]: Formatting capture keyed by node path
//! - [`flow`], [`comment`], [`reconcile`]: Text passes reimposing formatting
//! - [`array`]: Sequence editing operations
//! - [`merge`]: Deep merge of one document into another
//! - [`document`]: The facade tying all of the above together

mod array;
mod cache;
mod comment;
mod document;
mod error;
mod fingerprint;
mod flow;
pub mod merge;
mod node;
mod parse;
mod path;
mod reconcile;
mod render;
mod scan;
mod value;

pub use comment::CommentMode;
pub use document::Document;
pub use error::Error;
pub use merge::{parse_merge_policies, MergePolicy};
pub use node::{Node, NodeKind, NodeStyle, Scalar, ScalarKind};
pub use path::{escape_key, join_steps, parse_path, Step};
pub use render::{raw_value_string, yaml_value_string};
pub use value::{parse_value, Value};
