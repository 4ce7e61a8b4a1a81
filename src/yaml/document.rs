//! The document facade.
//!
//! A [`Document`] owns the parsed tree, the raw source text it came from,
//! and the lazily computed formatting fingerprint of that text. Every edit
//! mutates the tree, then re-serializes through the render/reconcile
//! pipeline and stores the result as the new raw text, so the next edit's
//! formatting decisions are made against the freshest source. Serialization
//! strips the encoder's trailing newlines and appends exactly the count the
//! original input had, which makes an unedited document round-trip
//! byte-for-byte.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;

use super::array;
use super::cache;
use super::comment::{self, CommentMode};
use super::error::Error;
use super::fingerprint::Fingerprint;
use super::merge::{self, MergePolicy};
use super::node::{Node, NodeKind};
use super::parse::parse_document;
use super::path::{self, Step};
use super::render::render;
use super::reconcile::reconcile;
use super::value::Value;

/// A YAML document that preserves its formatting across edits.
#[derive(Debug)]
pub struct Document {
    root: Node,
    /// Latest serialized form, the source of truth for formatting
    raw: String,
    /// Fingerprint of `raw`, computed on demand and dropped on mutation
    fingerprint: Option<Fingerprint>,
    trailing_newlines: usize,
    comment_mode: CommentMode,
}

impl Document {
    /// Parse a document from text. Empty input yields an empty mapping root.
    pub fn parse(text: &str) -> Result<Document, Error> {
        let parsed = parse_document(text)?;
        let trailing = text.len() - text.trim_end_matches('\n').len();
        debug!(
            "loaded document: {} root, {} trailing newlines",
            parsed.root.type_name(),
            trailing
        );
        Ok(Document {
            root: parsed.root,
            raw: text.to_string(),
            fingerprint: None,
            trailing_newlines: trailing,
            comment_mode: CommentMode::default(),
        })
    }

    /// Read and parse a document from a file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Document, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
        Document::parse(&text)
    }

    /// Write the serialized document to a file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)
            .map_err(|e| Error::Io(format!("Failed to write '{}': {}", path.display(), e)))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Resolve a path to its plain value.
    pub fn get(&self, path: &str) -> Result<Value, Error> {
        let steps = cache::parsed_steps(path)?;
        let node = path::resolve(&self.root, &steps, path)?;
        Ok(Value::from_node(node))
    }

    pub fn get_str(&self, path: &str) -> Result<String, Error> {
        match self.get(path)? {
            Value::String(s) => Ok(s),
            other => Err(type_error(path, "string", &other)),
        }
    }

    pub fn get_i64(&self, path: &str) -> Result<i64, Error> {
        match self.get(path)? {
            Value::Int(i) => Ok(i),
            other => Err(type_error(path, "int", &other)),
        }
    }

    pub fn get_f64(&self, path: &str) -> Result<f64, Error> {
        match self.get(path)? {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(type_error(path, "float", &other)),
        }
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, Error> {
        match self.get(path)? {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(path, "bool", &other)),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set the value at a path, creating missing intermediate mappings.
    ///
    /// An existing value is replaced in place (its comments carry over); a
    /// new key is appended at the end of its mapping, never reordering the
    /// existing keys.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), Error> {
        let steps = cache::parsed_steps(path)?;
        set_in_tree(&mut self.root, &steps, path, value.into())?;
        self.refresh();
        Ok(())
    }

    /// Delete the key or element at a path.
    pub fn remove(&mut self, path: &str) -> Result<(), Error> {
        let steps = cache::parsed_steps(path)?;
        remove_from_tree(&mut self.root, &steps, path)?;
        self.refresh();
        Ok(())
    }

    // =========================================================================
    // Sequence operations
    // =========================================================================

    /// Append to the sequence at `path`, creating a flow sequence if absent.
    pub fn append_to_array(&mut self, path: &str, value: impl Into<Value>) -> Result<(), Error> {
        let steps = cache::parsed_steps(path)?;
        array::append(&mut self.root, &steps, path, value.into())?;
        self.refresh();
        Ok(())
    }

    /// Insert into the sequence at `path`; `index == len` appends.
    pub fn insert_into_array(
        &mut self,
        path: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let steps = cache::parsed_steps(path)?;
        array::insert(&mut self.root, &steps, path, index, value.into())?;
        self.refresh();
        Ok(())
    }

    /// Replace the element at `index`, keeping its comments.
    pub fn update_array_element(
        &mut self,
        path: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let steps = cache::parsed_steps(path)?;
        array::update(&mut self.root, &steps, path, index, value.into())?;
        self.refresh();
        Ok(())
    }

    /// Remove and return the element at `index`.
    pub fn remove_from_array(&mut self, path: &str, index: usize) -> Result<Value, Error> {
        let steps = cache::parsed_steps(path)?;
        let removed = array::remove(&mut self.root, &steps, path, index)?;
        self.refresh();
        Ok(removed)
    }

    /// Read the element at `index` without touching the document.
    pub fn get_array_element(&self, path: &str, index: usize) -> Result<Value, Error> {
        let steps = cache::parsed_steps(path)?;
        array::get(&self.root, &steps, path, index)
    }

    /// Number of elements in the sequence at `path`.
    pub fn array_length(&self, path: &str) -> Result<usize, Error> {
        let steps = cache::parsed_steps(path)?;
        array::length(&self.root, &steps, path)
    }

    // =========================================================================
    // Array-root documents
    // =========================================================================

    /// Append a top-level element to an array-root document. An empty
    /// document becomes an array-root document.
    pub fn add_array_element(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        if self.root.is_null() || self.root.as_mapping().map_or(false, |m| m.is_empty()) {
            self.root = Node::sequence();
        }
        array::append(&mut self.root, &[], "", value.into())?;
        self.refresh();
        Ok(())
    }

    /// Set a value inside the top-level element at `index`; `path` may be
    /// empty to replace the element itself.
    pub fn set_array_element(
        &mut self,
        index: usize,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        self.check_root_index(index)?;
        self.set(&element_path(index, path), value)
    }

    /// Read a value inside the top-level element at `index`.
    pub fn get_array_document_element(&self, index: usize, path: &str) -> Result<Value, Error> {
        self.check_root_index(index)?;
        self.get(&element_path(index, path))
    }

    /// Serialize one top-level element as a standalone document. Document
    /// markers never apply at element level, so none are emitted.
    pub fn element_to_string(&self, index: usize) -> Result<String, Error> {
        self.check_root_index(index)?;
        let items = self.root.as_sequence().ok_or_else(|| {
            Error::Type(format!(
                "document root is {}, not a sequence.",
                self.root.type_name()
            ))
        })?;
        let rendered = render(&items[index]);
        let text = comment::align_comments(&rendered, &Fingerprint::default(), self.comment_mode);
        Ok(text + "\n")
    }

    fn check_root_index(&self, index: usize) -> Result<(), Error> {
        let items = self.root.as_sequence().ok_or_else(|| {
            Error::Type(format!(
                "document root is {}, not a sequence.",
                self.root.type_name()
            ))
        })?;
        if index >= items.len() {
            return Err(Error::Index(format!(
                "index {} is out of range ({} elements in document).",
                index,
                items.len()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Merging
    // =========================================================================

    /// Deep-merge an overlay document into this one.
    pub fn merge(
        &mut self,
        overlay: &Document,
        policies: &HashMap<String, MergePolicy>,
    ) -> Result<(), Error> {
        merge::merge_nodes(&mut self.root, &overlay.root, "", policies)?;
        self.refresh();
        Ok(())
    }

    // =========================================================================
    // Comment alignment
    // =========================================================================

    /// Choose how trailing comments are placed on the next serialization.
    pub fn set_comment_alignment(&mut self, mode: CommentMode) {
        self.comment_mode = mode;
    }

    /// Pad every inline `#` to a fixed one-based column.
    pub fn set_absolute_comment_alignment(&mut self, col: usize) {
        self.comment_mode = CommentMode::Absolute(col);
    }

    /// Keep each comment at its original distance from the content.
    pub fn enable_relative_comment_alignment(&mut self) {
        self.comment_mode = CommentMode::Relative;
    }

    /// Strip inline comments from the output.
    pub fn disable_comment_alignment(&mut self) {
        self.comment_mode = CommentMode::Disabled;
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize with the original formatting reimposed.
    pub fn to_yaml_string(&mut self) -> Result<String, Error> {
        Ok(self.serialized())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, Error> {
        Ok(self.serialized().into_bytes())
    }

    /// Run the full pipeline: push fingerprint styles onto the tree, render
    /// canonically, reconcile against the fingerprint, then normalize the
    /// trailing newlines to the recorded count.
    fn serialized(&mut self) -> String {
        let fp = self
            .fingerprint
            .take()
            .unwrap_or_else(|| Fingerprint::extract(&self.raw));
        fp.apply_to_tree(&mut self.root);
        let rendered = render(&self.root);
        let text = reconcile(&rendered, &self.raw, &fp, self.comment_mode, true);
        self.fingerprint = Some(fp);
        self.normalized(&text)
    }

    fn normalized(&self, text: &str) -> String {
        let body = text.trim_end_matches('\n');
        let mut buf = cache::take_buffer(body.len() + self.trailing_newlines);
        buf.push_str(body);
        for _ in 0..self.trailing_newlines {
            buf.push('\n');
        }
        buf
    }

    /// Re-serialize after a mutation and adopt the result as the new raw
    /// text, so the next fingerprint reflects the latest state.
    fn refresh(&mut self) {
        let text = self.serialized();
        cache::put_buffer(std::mem::replace(&mut self.raw, text));
        self.fingerprint = None;
    }
}

fn element_path(index: usize, path: &str) -> String {
    if path.is_empty() {
        format!("[{}]", index)
    } else {
        format!("[{}].{}", index, path)
    }
}

fn type_error(path: &str, wanted: &str, got: &Value) -> Error {
    Error::Type(format!(
        "invalid path '{}', expected {}, found {}.",
        path,
        wanted,
        got.type_name()
    ))
}

/// Place `value` at the path, creating what is missing on the way.
fn set_in_tree(root: &mut Node, steps: &[Step], path: &str, value: Value) -> Result<(), Error> {
    let (last, parents) = match steps.split_last() {
        Some(split) => split,
        None => return Err(Error::InvalidPath(format!("invalid path '{}'.", path))),
    };
    let parent = path::resolve_or_create(root, parents, path)?;
    if parent.is_null() {
        parent.kind = match last {
            Step::Key(_) => NodeKind::Mapping(Default::default()),
            Step::Index(_) => NodeKind::Sequence(Vec::new()),
        };
    }
    let tname = parent.type_name();
    match last {
        Step::Key(key) => match &mut parent.kind {
            NodeKind::Mapping(map) => {
                let mut node = value.to_node();
                if let Some(old) = map.get(key) {
                    node.inherit_presentation(old);
                }
                // IndexMap keeps the position of an existing key, so a
                // replace never reorders and a new key lands at the end.
                map.insert(key.clone(), node);
                Ok(())
            }
            NodeKind::Sequence(seq) => {
                let idx = path::resolve_index(key, seq.len(), path)?;
                let mut node = value.to_node();
                node.inherit_presentation(&seq[idx]);
                seq[idx] = node;
                Ok(())
            }
            NodeKind::Scalar(_) => Err(Error::Type(format!(
                "invalid path '{}', cannot traverse {} at '{}'.",
                path, tname, key
            ))),
        },
        Step::Index(idx) => match &mut parent.kind {
            NodeKind::Sequence(seq) => {
                while seq.len() <= *idx {
                    seq.push(Node::null());
                }
                let mut node = value.to_node();
                node.inherit_presentation(&seq[*idx]);
                seq[*idx] = node;
                Ok(())
            }
            _ => Err(Error::Type(format!(
                "invalid path '{}', cannot index into {} with '[{}]'.",
                path, tname, idx
            ))),
        },
    }
}

fn remove_from_tree(root: &mut Node, steps: &[Step], path: &str) -> Result<(), Error> {
    let (last, parents) = match steps.split_last() {
        Some(split) => split,
        None => return Err(Error::InvalidPath(format!("invalid path '{}'.", path))),
    };
    let parent = path::resolve_mut(root, parents, path)?;
    let tname = parent.type_name();
    match last {
        Step::Key(key) => match &mut parent.kind {
            NodeKind::Mapping(map) => map.shift_remove(key).map(|_| ()).ok_or_else(|| {
                Error::Path(format!(
                    "invalid path '{}', missing key '{}' in mapping.",
                    path, key
                ))
            }),
            NodeKind::Sequence(seq) => {
                let idx = path::resolve_index(key, seq.len(), path)?;
                seq.remove(idx);
                Ok(())
            }
            NodeKind::Scalar(_) => Err(Error::Type(format!(
                "invalid path '{}', cannot traverse {} at '{}'.",
                path, tname, key
            ))),
        },
        Step::Index(idx) => match &mut parent.kind {
            NodeKind::Sequence(seq) => {
                if *idx >= seq.len() {
                    return Err(Error::Index(format!(
                        "invalid path '{}', index {} is out of range ({} elements in sequence).",
                        path,
                        idx,
                        seq.len()
                    )));
                }
                seq.remove(*idx);
                Ok(())
            }
            _ => Err(Error::Type(format!(
                "invalid path '{}', cannot index into {} with '[{}]'.",
                path, tname, idx
            ))),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
