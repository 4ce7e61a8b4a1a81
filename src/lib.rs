pub mod cli;
pub mod yaml;

pub use yaml::{CommentMode, Document, Error, MergePolicy, Value};
