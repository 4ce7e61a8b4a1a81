use clap::{Parser, Subcommand};

/// Edits YAML documents while preserving their formatting
#[derive(Parser)]
#[command(author, about, long_about=None, disable_version_flag(true))]
pub struct Args {
    /// force color mode (defaults to check tty)
    #[arg(long)]
    pub color: bool,

    /// force no-color mode (defaults to check tty)
    #[arg(long)]
    pub no_color: bool,

    /// display version and quit
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    /// prepend time to each log line
    #[arg(long)]
    pub log_time: bool,

    /// Turn general verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configure component wise logging
    #[arg(long, short, action = clap::ArgAction::Append)]
    pub log: Option<Vec<String>>,

    /// quiet path errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Read the document from FILE instead of stdin
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<String>,

    /// Write the result back to FILE instead of stdout
    #[arg(short = 'i', long = "in-place", global = true, requires = "file")]
    pub in_place: bool,

    /// Align inline comments to a fixed column
    #[arg(long = "comment-col", global = true, value_name = "N")]
    pub comment_col: Option<usize>,

    /// Strip inline comments from the output
    #[arg(long = "no-comments", global = true)]
    pub no_comments: bool,

    #[command(subcommand)]
    pub action: Option<Actions>,
}

#[derive(Subcommand)]
pub enum Actions {
    Get {
        /// Get the value at a given path

        /// The path to get the value of; omit for the whole document
        #[clap(name = "PATH")]
        path: Option<String>,

        /// Output strict YAML instead of a raw scalar
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Set {
        /// Set a value at a given path

        /// The path where to set the value
        #[clap(name = "PATH")]
        path: String,

        /// The value to set
        #[clap(name = "VALUE")]
        value: String,

        /// Interpret value as YAML instead of literal string
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Del {
        /// Delete the key or element at a given path

        /// The path to delete
        #[clap(name = "PATH")]
        path: String,
    },
    Append {
        /// Append a value to the array at a given path

        /// The path of the array
        #[clap(name = "PATH")]
        path: String,

        /// The value to append
        #[clap(name = "VALUE")]
        value: String,

        /// Interpret value as YAML instead of literal string
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Insert {
        /// Insert a value into the array at a given path

        /// The path of the array
        #[clap(name = "PATH")]
        path: String,

        /// The position to insert at; equal to the length appends
        #[clap(name = "INDEX")]
        index: usize,

        /// The value to insert
        #[clap(name = "VALUE")]
        value: String,

        /// Interpret value as YAML instead of literal string
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Update {
        /// Replace an element of the array at a given path

        /// The path of the array
        #[clap(name = "PATH")]
        path: String,

        /// The position of the element to replace
        #[clap(name = "INDEX")]
        index: usize,

        /// The new value
        #[clap(name = "VALUE")]
        value: String,

        /// Interpret value as YAML instead of literal string
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Remove {
        /// Remove an element from the array at a given path

        /// The path of the array
        #[clap(name = "PATH")]
        path: String,

        /// The position of the element to remove
        #[clap(name = "INDEX")]
        index: usize,
    },
    Apply {
        /// Apply overlay YAML file(s) to the base document

        /// Merge policy for specific paths (PATH=POLICY where POLICY is merge|replace|prepend)
        #[arg(short = 'm', long = "merge-policy", value_delimiter = ',', action = clap::ArgAction::Append)]
        merge_policy: Option<Vec<String>>,

        /// Overlay file(s) to apply
        #[clap(name = "OVERLAY", required = true)]
        overlays: Vec<String>,
    },
}
